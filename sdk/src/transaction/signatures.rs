//! Per-(node, chunk) signature storage.
//!
//! Internally a flat map keyed by `(node, chunk index, public key)`. A key can
//! only ever hold one signature, so adding the same signer twice overwrites
//! and the idempotence property falls out of the data structure. The nested
//! "node -> key -> signature" shape callers expect is a read-only projection.

use std::collections::BTreeMap;

use crate::codec::SignaturePair;
use crate::crypto::PublicKey;
use crate::id::AccountId;

type SignatureKey = (AccountId, usize, PublicKey);

/// Signatures collected for a frozen transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureStore {
    entries: BTreeMap<SignatureKey, Vec<u8>>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `signature`, replacing any previous one from the same signer
    /// for the same pair.
    pub fn insert(
        &mut self,
        node_id: AccountId,
        chunk_index: usize,
        public_key: PublicKey,
        signature: Vec<u8>,
    ) {
        self.entries
            .insert((node_id, chunk_index, public_key), signature);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total stored signatures across every pair.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether `public_key` has signed every one of `pairs`.
    pub fn has_signed_all(
        &self,
        public_key: &PublicKey,
        pairs: impl IntoIterator<Item = (AccountId, usize)>,
    ) -> bool {
        pairs
            .into_iter()
            .all(|(node, chunk)| self.entries.contains_key(&(node, chunk, *public_key)))
    }

    /// Wire signatures for one pair, ordered by public key.
    pub fn pairs_for(&self, node_id: &AccountId, chunk_index: usize) -> Vec<SignaturePair> {
        self.entries
            .iter()
            .filter(|((node, chunk, _), _)| node == node_id && *chunk == chunk_index)
            .map(|((_, _, public_key), signature)| SignaturePair {
                public_key: *public_key,
                signature: signature.clone(),
            })
            .collect()
    }

    /// The nested view for one chunk: node -> public key -> signature.
    pub fn project(&self, chunk_index: usize) -> BTreeMap<AccountId, BTreeMap<PublicKey, Vec<u8>>> {
        let mut view: BTreeMap<AccountId, BTreeMap<PublicKey, Vec<u8>>> = BTreeMap::new();
        for ((node, chunk, public_key), signature) in &self.entries {
            if *chunk == chunk_index {
                view.entry(node.clone())
                    .or_default()
                    .insert(*public_key, signature.clone());
            }
        }
        view
    }

    /// Every entry in key order, used by the canonical rendering.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, usize, &PublicKey, &[u8])> {
        self.entries
            .iter()
            .map(|((node, chunk, key), sig)| (node, *chunk, key, sig.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    fn key(seed: u8) -> PublicKey {
        PrivateKey::from_seed(&[seed; 32]).public_key()
    }

    #[test]
    fn same_signer_same_pair_overwrites() {
        let mut store = SignatureStore::new();
        let node = AccountId::from_num(3);
        store.insert(node.clone(), 0, key(1), vec![1]);
        store.insert(node.clone(), 0, key(1), vec![2]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.project(0)[&node][&key(1)], vec![2]);
    }

    #[test]
    fn projection_is_per_chunk() {
        let mut store = SignatureStore::new();
        let node = AccountId::from_num(3);
        store.insert(node.clone(), 0, key(1), vec![0xA]);
        store.insert(node.clone(), 1, key(1), vec![0xB]);

        assert_eq!(store.project(0)[&node][&key(1)], vec![0xA]);
        assert_eq!(store.project(1)[&node][&key(1)], vec![0xB]);
        assert!(store.project(2).is_empty());
    }

    #[test]
    fn pairs_for_filters_by_node_and_chunk() {
        let mut store = SignatureStore::new();
        store.insert(AccountId::from_num(3), 0, key(1), vec![1]);
        store.insert(AccountId::from_num(3), 0, key(2), vec![2]);
        store.insert(AccountId::from_num(4), 0, key(1), vec![3]);

        let pairs = store.pairs_for(&AccountId::from_num(3), 0);
        assert_eq!(pairs.len(), 2);
        assert!(store.pairs_for(&AccountId::from_num(5), 0).is_empty());
    }

    #[test]
    fn has_signed_all_checks_every_pair() {
        let mut store = SignatureStore::new();
        store.insert(AccountId::from_num(3), 0, key(1), vec![1]);
        let pairs = vec![(AccountId::from_num(3), 0), (AccountId::from_num(4), 0)];
        assert!(!store.has_signed_all(&key(1), pairs.clone()));

        store.insert(AccountId::from_num(4), 0, key(1), vec![1]);
        assert!(store.has_signed_all(&key(1), pairs));
    }
}
