//! Encode/decode directives applied to resolved content.

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use percent_encoding::{percent_decode, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tide_core::{Directive, Labels, VariableKind};

use crate::error::{VariableError, VariableResult};

/// URL-safe alphabet, unpadded output, padding optional on input.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Everything but the URI-component unreserved set gets escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Padding optional on input, so hand-written values decode.
const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Base64,
    Base64Url,
    Hex,
    Url,
}

impl Codec {
    pub const ALL: [Codec; 4] = [Self::Base64, Self::Base64Url, Self::Hex, Self::Url];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
            Self::Hex => "hex",
            Self::Url => "url",
        }
    }

    fn supported() -> String {
        Self::ALL.map(|c| c.as_str()).join(", ")
    }

    pub fn encode(&self, input: &[u8]) -> Vec<u8> {
        match self {
            Self::Base64 => STANDARD.encode(input).into_bytes(),
            Self::Base64Url => BASE64_URL.encode(input).into_bytes(),
            Self::Hex => hex::encode(input).into_bytes(),
            Self::Url => percent_encode(input, URI_COMPONENT).to_string().into_bytes(),
        }
    }

    /// Decode `input`. Surrounding whitespace is ignored.
    pub fn decode(&self, input: &[u8]) -> Result<Vec<u8>, String> {
        let input = input.trim_ascii();
        match self {
            Self::Base64 => BASE64_LENIENT.decode(input).map_err(|e| e.to_string()),
            Self::Base64Url => BASE64_URL.decode(input).map_err(|e| e.to_string()),
            Self::Hex => hex::decode(input).map_err(|e| e.to_string()),
            Self::Url => Ok(percent_decode(input).collect()),
        }
    }
}

/// A content transformation requested by a directive label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Encode(Codec),
    Decode(Codec),
}

impl Transform {
    /// Read the encode/decode directive from a declaration's labels.
    pub fn from_labels(kind: VariableKind, name: &str, labels: &Labels) -> VariableResult<Option<Self>> {
        let encode = labels.get(Directive::Encode.key());
        let decode = labels.get(Directive::Decode.key());
        let (direction, value) = match (encode, decode) {
            (Some(_), Some(_)) => {
                return Err(VariableError::ConflictingCodec {
                    kind,
                    name: name.to_string(),
                });
            }
            (Some(v), None) => ("encode", v),
            (None, Some(v)) => ("decode", v),
            (None, None) => return Ok(None),
        };
        let codec = Codec::parse(value).ok_or_else(|| VariableError::UnknownCodec {
            name: name.to_string(),
            direction,
            value: value.clone(),
            supported: Codec::supported(),
        })?;
        Ok(Some(match direction {
            "encode" => Self::Encode(codec),
            _ => Self::Decode(codec),
        }))
    }

    pub fn apply(&self, name: &str, content: &[u8]) -> VariableResult<Vec<u8>> {
        match self {
            Self::Encode(codec) => Ok(codec.encode(content)),
            Self::Decode(codec) => codec.decode(content).map_err(|reason| VariableError::Codec {
                name: name.to_string(),
                direction: "decode",
                codec: codec.as_str(),
                reason,
            }),
        }
    }
}
