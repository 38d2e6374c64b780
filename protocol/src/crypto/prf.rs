//! Keyed pseudo-random function used for addresses, serial numbers and the
//! signature-binding value `h_`.
//!
//! `PRF_role(key, input) = Poseidon(role, key, input)`. The role tag keeps
//! the three uses independent: knowing a nullifier says nothing about the
//! address, and vice versa.

use ark_bn254::Fr;
use ark_ff::Zero;

use super::poseidon::poseidon_hash;

/// What a PRF output is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum PrfRole {
    /// `a_pk = PRF_addr(a_sk, 0)`.
    Address = 1,
    /// `sn = PRF_sn(a_sk, rho)`.
    SerialNumber = 2,
    /// `h_ = PRF_pk(a_sk, hSig)`.
    PublicKey = 3,
}

impl PrfRole {
    /// The role as a field element.
    pub fn tag(self) -> Fr {
        Fr::from(self as u64)
    }
}

/// Evaluate the PRF for `role` under `key`.
pub fn prf(role: PrfRole, key: &Fr, input: &Fr) -> Fr {
    poseidon_hash(&[role.tag(), *key, *input])
}

/// Public address of a spending key.
pub fn address_of(spending_key: &Fr) -> Fr {
    prf(PrfRole::Address, spending_key, &Fr::zero())
}

/// Serial number (nullifier) of the coin with seed `rho`.
pub fn serial_number(spending_key: &Fr, rho: &Fr) -> Fr {
    prf(PrfRole::SerialNumber, spending_key, rho)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_independent() {
        let key = Fr::from(42u64);
        let input = Fr::from(7u64);
        let addr = prf(PrfRole::Address, &key, &input);
        let sn = prf(PrfRole::SerialNumber, &key, &input);
        let pk = prf(PrfRole::PublicKey, &key, &input);
        assert_ne!(addr, sn);
        assert_ne!(sn, pk);
        assert_ne!(addr, pk);
    }

    #[test]
    fn serial_number_is_deterministic_and_seed_bound() {
        let key = Fr::from(42u64);
        let rho1 = Fr::from(1u64);
        let rho2 = Fr::from(2u64);
        assert_eq!(serial_number(&key, &rho1), serial_number(&key, &rho1));
        assert_ne!(serial_number(&key, &rho1), serial_number(&key, &rho2));
    }

    #[test]
    fn different_keys_give_different_addresses() {
        assert_ne!(address_of(&Fr::from(1u64)), address_of(&Fr::from(2u64)));
    }
}
