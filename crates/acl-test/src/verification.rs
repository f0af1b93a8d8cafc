//! Verification helpers for testing against the simulated store
//!
//! Provides assertion helpers over the simulator's stored rules and
//! request log.

use thiserror::Error;
use tnsr_acl_common::Method;

use crate::fixtures::rule_fixtures::origin_description;
use crate::simulator::SimulatedRestconf;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("ACL '{acl}' holds sequences {actual:?}, expected {expected:?}")]
    SequenceMismatch {
        acl: String,
        expected: Vec<u32>,
        actual: Vec<u32>,
    },

    #[error("No rule at sequence {sequence} in ACL '{acl}'")]
    RuleNotFound { acl: String, sequence: u32 },

    #[error("Value mismatch for {acl}/{sequence}:{field}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        acl: String,
        sequence: u32,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} write requests, found {actual}")]
    WriteCountMismatch { expected: usize, actual: usize },

    #[error("Write requests out of order: {0}")]
    OrderViolation(String),
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Store verification helper
pub struct StoreVerifier<'a> {
    sim: &'a SimulatedRestconf,
}

impl<'a> StoreVerifier<'a> {
    pub fn new(sim: &'a SimulatedRestconf) -> Self {
        Self { sim }
    }

    /// Verify the exact set of stored sequence numbers
    pub fn assert_sequences(&self, acl: &str, expected: &[u32]) -> VerifyResult<()> {
        let actual = self.sim.sequences(acl);
        let mut expected = expected.to_vec();
        expected.sort_unstable();
        if actual != expected {
            return Err(VerificationError::SequenceMismatch {
                acl: acl.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that a rule field has a specific value
    pub fn assert_field_value(
        &self,
        acl: &str,
        sequence: u32,
        field: &str,
        expected: &str,
    ) -> VerifyResult<()> {
        let rule = self
            .sim
            .rule(acl, sequence)
            .ok_or_else(|| VerificationError::RuleNotFound {
                acl: acl.to_string(),
                sequence,
            })?;
        let actual = rule.field_value(field).unwrap_or_default();
        if actual != expected {
            return Err(VerificationError::ValueMismatch {
                acl: acl.to_string(),
                sequence,
                field: field.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Verify that the fixture rule seeded at `origin` now lives at `sequence`
    pub fn assert_moved(&self, acl: &str, origin: u32, sequence: u32) -> VerifyResult<()> {
        self.assert_field_value(
            acl,
            sequence,
            "acl-rule-description",
            &origin_description(origin),
        )
    }

    /// Verify the number of PUT, POST and DELETE requests
    pub fn assert_write_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.sim.write_count();
        if actual != expected {
            return Err(VerificationError::WriteCountMismatch { expected, actual });
        }
        Ok(())
    }

    /// Verify that no PUT, POST or DELETE was issued
    pub fn assert_no_writes(&self) -> VerifyResult<()> {
        self.assert_write_count(0)
    }

    /// Verify that writes targeted strictly descending sequences and each
    /// delete directly followed the write that replaced it
    pub fn assert_descending_moves(&self) -> VerifyResult<()> {
        let writes = self.sim.write_calls();
        let mut last_put: Option<u32> = None;

        for pair in writes.chunks(2) {
            let [put, delete] = pair else {
                return Err(VerificationError::OrderViolation(
                    "odd number of write requests".to_string(),
                ));
            };
            if put.method != Method::Put || delete.method != Method::Delete {
                return Err(VerificationError::OrderViolation(format!(
                    "expected PUT then DELETE, got {} then {}",
                    put.method, delete.method
                )));
            }
            if let (Some(prev), Some(current)) = (last_put, put.sequence) {
                if current >= prev {
                    return Err(VerificationError::OrderViolation(format!(
                        "PUT {} issued after PUT {}",
                        current, prev
                    )));
                }
            }
            last_put = put.sequence;
        }
        Ok(())
    }
}
