use anyhow::Result;
use bytes::Bytes;
use image::ImageFormat;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::infra::storage::ObjectStorage;

/// Size rule for one kind of upload. The message is what the client sees
/// when `max_bytes` is exceeded.
#[derive(Debug, Clone, Copy)]
pub struct ImageLimit {
    pub max_bytes: usize,
    pub too_large_message: &'static str,
}

// Enforced at 50MB while the message reports 1MB.
pub const POST_IMAGE_LIMIT: ImageLimit = ImageLimit {
    max_bytes: 50 * 1024 * 1024,
    too_large_message: "image is too large, the maximum allowed size is 1MB",
};

pub const PROFILE_IMAGE_LIMIT: ImageLimit = ImageLimit {
    max_bytes: 2 * 1024 * 1024,
    too_large_message: "image is too large, maximum is 2MB",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Post,
    Profile,
}

impl ImageKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Post => "posts/images",
            Self::Profile => "users/images",
        }
    }

    pub fn limit(self) -> ImageLimit {
        match self {
            Self::Post => POST_IMAGE_LIMIT,
            Self::Profile => PROFILE_IMAGE_LIMIT,
        }
    }
}

/// An upload that passed the size check and decodes as a supported format.
#[derive(Debug, Clone)]
pub struct CheckedImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone)]
pub struct ImageService {
    storage: ObjectStorage,
}

impl ImageService {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// Validates and uploads an image, returning its storage key.
    pub async fn store(&self, kind: ImageKind, bytes: Bytes) -> Result<String> {
        let checked = inspect(bytes, kind.limit())?;
        let key = format!("{}/{}.{}", kind.prefix(), Uuid::new_v4(), checked.extension);

        self.storage
            .put_object(&key, checked.bytes, checked.content_type)
            .await?;

        tracing::info!(
            key = %key,
            width = checked.width,
            height = checked.height,
            "image stored"
        );
        Ok(key)
    }
}

pub fn inspect(bytes: Bytes, limit: ImageLimit) -> Result<CheckedImage, DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::invalid("image file is empty"));
    }
    if bytes.len() > limit.max_bytes {
        return Err(DomainError::invalid(limit.too_large_message));
    }

    let format = image::guess_format(&bytes)
        .map_err(|_| DomainError::invalid("upload a valid image"))?;
    let (content_type, extension) = match format {
        ImageFormat::Jpeg => ("image/jpeg", "jpg"),
        ImageFormat::Png => ("image/png", "png"),
        ImageFormat::WebP => ("image/webp", "webp"),
        _ => return Err(DomainError::invalid("image must be PNG, JPEG or WebP")),
    };

    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|_| DomainError::invalid("upload a valid image"))?;

    Ok(CheckedImage {
        width: decoded.width(),
        height: decoded.height(),
        bytes,
        content_type,
        extension,
    })
}
