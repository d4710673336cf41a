//! Strongly-typed identifiers used across the pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a fetch job.
///
/// Stable for the life of the job: every redelivery of the same job carries
/// the same `JobId`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

/// Handle for one specific delivery of a job.
///
/// Minted fresh on every receive and consumed by acknowledge/dead-letter.
/// Once a lapsed job has been handed out again, the older handle is
/// rejected; until that redelivery it still settles the job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptHandle(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty) => {
        impl $t {
            /// Mint a fresh identifier. UUIDv7, so values sort by creation
            /// time in logs and queue dumps.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_uuid_newtype!(JobId);
impl_uuid_newtype!(ReceiptHandle);
