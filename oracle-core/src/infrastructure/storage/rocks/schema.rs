use crate::foundation::Hash32;

/// Helper to build storage keys consistently.
pub struct KeyBuilder {
    buf: Vec<u8>,
}

impl KeyBuilder {
    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap) }
    }

    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.buf.extend_from_slice(prefix);
        self
    }

    pub fn hash32(mut self, hash: &Hash32) -> Self {
        self.buf.extend_from_slice(hash);
        self
    }

    pub fn str(mut self, value: &str) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn u64_be(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn sep(mut self) -> Self {
        self.buf.push(b':');
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

pub const CF_DEFAULT: &str = "default";
pub const CF_METADATA: &str = "metadata";
pub const CF_TASK: &str = "task";
// due:<next_check_be><id_be> and grp:<filter_field>:<id_be>, pending tasks only
pub const CF_TASK_INDEX: &str = "task_index";
pub const CF_HANDLED: &str = "handled";
pub const CF_LOCKED: &str = "locked";
pub const CF_RSA: &str = "rsa";
pub const CF_GUESS: &str = "guess";
// sig:<seq_be> records and tsig:<task_id_be> -> seq_be
pub const CF_SIGNED: &str = "signed";
pub const CF_SENT: &str = "sent";

pub const META_SCHEMA_VERSION: &[u8] = b"schema_version";
pub const META_TASK_SEQ: &[u8] = b"task_seq";
pub const META_SIGNED_SEQ: &[u8] = b"signed_seq";
pub const META_SENT_SEQ: &[u8] = b"sent_seq";
