//! Non-owning identity-to-token registry for recipe closures.
//!
//! Cache keys need a stable fragment per distinct recipe identity. The
//! registry maps the address of a recipe's `Arc` allocation to a token, but
//! holds only a `Weak` reference, so registration never extends a recipe's
//! lifetime. A dead `Weak` means the address may have been reused by a new
//! allocation, so it gets a fresh token; dead entries are swept once the
//! table grows past a watermark.

use crate::MemoRecipeFn;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct IdentitySlot {
    live: Weak<MemoRecipeFn>,
    token: u64,
}

/// Maps recipe allocations to stable per-identity tokens.
pub(crate) struct IdentityRegistry {
    slots: HashMap<usize, IdentitySlot>,
    next_token: u64,
    sweep_at: usize,
}

impl IdentityRegistry {
    pub(crate) fn new() -> Self {
        IdentityRegistry {
            slots: HashMap::new(),
            next_token: 0,
            sweep_at: 64,
        }
    }

    /// Token for this recipe identity. Repeated calls with the same (still
    /// alive) allocation return the same token.
    pub(crate) fn token_for(&mut self, recipe: &Arc<MemoRecipeFn>) -> u64 {
        if self.slots.len() >= self.sweep_at {
            self.sweep();
        }

        let addr = Arc::as_ptr(recipe) as *const () as usize;
        if let Some(slot) = self.slots.get(&addr) {
            // Alive at the same address means it is the same allocation.
            if slot.live.strong_count() > 0 {
                return slot.token;
            }
        }

        let token = self.next_token;
        self.next_token += 1;
        self.slots.insert(
            addr,
            IdentitySlot {
                live: Arc::downgrade(recipe),
                token,
            },
        );
        token
    }

    /// Drop entries whose recipe has been freed.
    fn sweep(&mut self) {
        self.slots.retain(|_, slot| slot.live.strong_count() > 0);
        self.sweep_at = (self.slots.len() * 2).max(64);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
