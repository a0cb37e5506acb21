//! Build-time memory budget for caller-owned structures

use log::trace;

use crate::errors::Error;

/// Byte-budget ledger for one build attempt.
///
/// Node pools and tables charge the arena before growing; once the limit is
/// reached the whole build fails and the caller discards or `reset`s the
/// arena together with the partial structures — the single-bulk-free
/// lifecycle of a configuration generation.
#[derive(Debug)]
pub struct Arena {
    limit: usize,
    used: usize,
}

impl Arena {
    /// Budget capped at `limit` bytes.
    pub fn with_limit(limit: usize) -> Arena {
        Arena { limit, used: 0 }
    }

    /// No cap; accounting only.
    pub fn unbounded() -> Arena {
        Arena {
            limit: usize::MAX,
            used: 0,
        }
    }

    /// Reserve `bytes` from the budget.
    pub fn charge(&mut self, bytes: usize) -> Result<(), Error> {
        let remaining = self.limit - self.used;
        if bytes > remaining {
            return Err(Error::ArenaExhausted {
                requested: bytes,
                remaining,
            });
        }
        self.used += bytes;
        trace!("[ARENA] charged {} bytes, used={}", bytes, self.used);
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.used
    }

    /// Forget all charges, keeping the limit.
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

impl Default for Arena {
    fn default() -> Arena {
        Arena::unbounded()
    }
}
