use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentType {
    Md5,
    Sha1,
    Sha256,
    /// 64-bit perceptual hash over low DCT frequencies.
    Dct0,
}

impl IdentType {
    /// Value stored in the `ident_type` column.
    pub fn as_i32(&self) -> i32 {
        match self {
            IdentType::Md5 => 1,
            IdentType::Sha1 => 2,
            IdentType::Sha256 => 3,
            IdentType::Dct0 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicIdent {
    pub pic_id: i64,
    pub ident_type: IdentType,
    pub value: Vec<u8>,
    /// Inputs to the perceptual hash, kept for debugging.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dct0_values: Vec<f32>,
}

impl PicIdent {
    /// Perceptual hash as an integer, if this is a well-formed DCT ident.
    pub fn dct0_hash(&self) -> Option<u64> {
        if self.ident_type != IdentType::Dct0 {
            return None;
        }
        let bytes: [u8; 8] = self.value.as_slice().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }
}
