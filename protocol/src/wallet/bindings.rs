//! Address book: every public address the wallet has ever handed out, mapped
//! to its spending key.
//!
//! Rotating to a fresh address never forgets an old one. Coins sent to a
//! previous address still need its key to be spent.

use std::collections::HashMap;

use crate::crypto::keys::{PublicAddress, ShieldedKeypair, SpendingKey};

/// `a_pk -> a_sk` for all of a wallet's addresses, plus the current one.
#[derive(Debug, Clone)]
pub struct AddressBindings {
    keys: HashMap<PublicAddress, ShieldedKeypair>,
    current: PublicAddress,
}

impl AddressBindings {
    /// Bindings holding one freshly generated address.
    pub fn generate() -> Self {
        Self::with_keypair(ShieldedKeypair::generate())
    }

    /// Bindings holding `keypair` as the current address.
    pub fn with_keypair(keypair: ShieldedKeypair) -> Self {
        let current = keypair.address();
        let mut keys = HashMap::new();
        keys.insert(current, keypair);
        Self { keys, current }
    }

    /// Generate a new address and make it current. Returns it.
    pub fn rotate(&mut self) -> PublicAddress {
        self.bind(ShieldedKeypair::generate())
    }

    /// Add `keypair` and make it current. Returns its address.
    pub fn bind(&mut self, keypair: ShieldedKeypair) -> PublicAddress {
        let address = keypair.address();
        self.keys.insert(address, keypair);
        self.current = address;
        address
    }

    /// The address new coins are received on.
    pub fn current_address(&self) -> PublicAddress {
        self.current
    }

    /// Spending key of the current address.
    pub fn current_key(&self) -> Option<&SpendingKey> {
        self.spending_key_for(&self.current)
    }

    /// Spending key for `address`, if it is one of ours.
    pub fn spending_key_for(&self, address: &PublicAddress) -> Option<&SpendingKey> {
        self.keys.get(address).map(|kp| kp.spending_key())
    }

    /// True if `address` is one of ours.
    pub fn contains(&self, address: &PublicAddress) -> bool {
        self.keys.contains_key(address)
    }

    /// Number of addresses ever bound.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false: there is at least the current address.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_keeps_old_keys() {
        let mut book = AddressBindings::generate();
        let first = book.current_address();
        let second = book.rotate();

        assert_ne!(first, second);
        assert_eq!(book.current_address(), second);
        assert_eq!(book.len(), 2);
        assert!(book.spending_key_for(&first).is_some());
        assert_eq!(
            book.spending_key_for(&second).map(|k| k.public_address()),
            Some(second)
        );
    }

    #[test]
    fn unknown_address_has_no_key() {
        let book = AddressBindings::generate();
        let stranger = ShieldedKeypair::generate().address();
        assert!(!book.contains(&stranger));
        assert!(book.spending_key_for(&stranger).is_none());
        assert!(book.current_key().is_some());
    }
}
