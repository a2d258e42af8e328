//! Identity-deduplicated release — part of C10's ordered shutdown.
//!
//! A block can, in principle, appear in more than one routing slot (the
//! same processor registered under two input types); its release hook
//! must run exactly once. Dedup is by pointer identity, mirroring the
//! original runtime's `id(processor)` bookkeeping.

use std::collections::HashSet;

use crate::blocks::Identity;

/// Runs `release` on each item exactly once, in iteration order,
/// skipping items whose identity has already been seen. Collects every
/// error rather than stopping at the first one, so a release failure
/// never leaves remaining blocks un-released.
pub fn release_all<T>(
    items: impl IntoIterator<Item = T>,
    identity: impl Fn(&T) -> Identity,
    mut release: impl FnMut(&mut T) -> anyhow::Result<()>,
) -> Vec<anyhow::Error>
where
    T: Sized,
{
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    for mut item in items {
        let id = identity(&item);
        if !seen.insert(id) {
            continue;
        }
        if let Err(err) = release(&mut item) {
            errors.push(err);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_by_identity_and_collects_errors() {
        struct Thing(u32, bool);
        let a = Thing(1, false);
        let b = Thing(2, true);
        let ptr_a = &a as *const Thing as Identity;
        let items = vec![a, b];

        let mut released = Vec::new();
        let errors = release_all(
            items,
            |t| {
                if t.0 == 1 {
                    ptr_a
                } else {
                    std::ptr::null()
                }
            },
            |t| {
                released.push(t.0);
                if t.1 {
                    anyhow::bail!("boom")
                } else {
                    Ok(())
                }
            },
        );
        assert_eq!(released, vec![1, 2]);
        assert_eq!(errors.len(), 1);
    }
}
