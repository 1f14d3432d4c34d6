#![allow(dead_code)]

pub const TEST_PUBKEYS: [&str; 3] = [
    "02a1633cafcc01ebfb6d78e39f687a1f0995c62fc95f51ead10a02ee0be551b5dc",
    "03b5c2e7c9c3f0b1d8d8f6a3a0f8f8d6e0c1b2a3948576a6b7c8d9e0f1a2b3c4d5",
    "02c7f1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e7f",
];
pub const TEST_PREV_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
pub const TEST_PAYEE_ADDRESS: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";
pub const TEST_RETURN_ADDRESS: &str = "1dice8EMZmqKvrGE4Qc9bUFf9PX3xaYDp";
pub const TEST_GREATER_ADDRESS: &str = "1GreaterXXXXXXXXXXXXXXXXXXXXXXXXX";
pub const TEST_LESSER_ADDRESS: &str = "1LesserXXXXXXXXXXXXXXXXXXXXXXXXXX";
pub const TEST_CLAIMANT_EARLY: &str = "1EarlyClaimantXXXXXXXXXXXXXXXXXXX";
pub const TEST_CLAIMANT_LATE: &str = "1LateClaimantXXXXXXXXXXXXXXXXXXXX";
pub const TEST_ORACLE_FEE_ADDRESS: &str = "1OracleFeeXXXXXXXXXXXXXXXXXXXXXXX";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_RSA_BITS: usize = 1024;
pub const TEST_RETRY_INTERVAL_SECS: u64 = 60;
pub const TEST_MAX_RETRIES: u32 = 10;
