use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    error::{Error, Result},
    models::Image,
};

impl Image {
    /// Decodes a `data:<mime>;base64,<payload>` URI as sent by clients.
    pub fn from_data_uri(value: &str) -> Result<Self> {
        let invalid = |message: &'static str| Error::validation("image", message);

        let rest = value
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| invalid("expected a data URI"))?;
        let (content_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| invalid("expected a base64 encoded data URI"))?;

        if !content_type.starts_with("image/") {
            return Err(invalid("data URI is not an image"));
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|_| invalid("invalid base64 payload"))?;
        if data.is_empty() {
            return Err(invalid("image is empty"));
        }

        Ok(Self {
            content_type: content_type.to_string(),
            data,
        })
    }
}
