//! Domain layer: pure contract types and rules. No I/O and no logging.

pub mod amount;
pub mod blind;
pub mod contract;
pub mod hashes;
pub mod message;
pub mod payout;
pub mod policy;
pub mod protocol;
pub mod records;
pub mod selection;
pub mod task;
pub mod transaction;

pub use amount::{BtcAmount, Decimal};
pub use contract::*;
pub use message::InboundMessage;
pub use policy::EnginePolicy;
pub use protocol::{Operation, SignedTransactionBroadcast};
pub use records::*;
pub use task::{NewTask, Task};
pub use transaction::{PrevTx, TxInput, TxOutput, TxTemplate};
