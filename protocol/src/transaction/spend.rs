//! Spend transactions: one coin in, two coins out.
//!
//! The transaction carries the proof's public inputs, the proof itself, and
//! a one-time Ed25519 verifying key with a signature over everything else.
//! `hSig` is the hash of that key and is a public input of the proof, so the
//! signature, the key and the proof stand or fall together.

use ark_bn254::Fr;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::types::{TransactionError, TxId};
use crate::crypto::hash::{blake3_hash, fr_from_bytes, fr_to_bytes, hash_to_field};
use crate::zkp::circuit::SpendPublicInputs;
use crate::zkp::commitment::CoinCommitment;
use crate::zkp::nullifier::Nullifier;
use crate::zkp::prover::SpendProof;
use crate::zkp::verifier::SpendVerifier;

/// `{nullifier, cmNew1, cmNew2, hSig, proof}` plus the anchor, `h_`, and
/// the one-time signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendTransaction {
    /// Root of the confirmed ledger the proof is checked against.
    pub anchor: [u8; 32],
    /// Serial number of the consumed coin.
    pub nullifier: Nullifier,
    /// Payment output.
    pub cm_new1: CoinCommitment,
    /// Change output.
    pub cm_new2: CoinCommitment,
    /// `H(pk_sig)` as a canonical scalar.
    pub h_sig: [u8; 32],
    /// `PRF_pk(a_sk, hSig)` as a canonical scalar.
    pub h_: [u8; 32],
    /// The spend proof.
    pub proof: SpendProof,
    /// One-time Ed25519 verifying key.
    pub pk_sig: [u8; 32],
    /// Signature by the one-time key over [`Self::signable_bytes`].
    pub signature: Vec<u8>,
}

/// `hSig` for a one-time verifying key.
pub fn h_sig_of(pk_sig: &VerifyingKey) -> Fr {
    hash_to_field(pk_sig.as_bytes())
}

impl SpendTransaction {
    /// Build and sign a spend. `signing_key` must be the key whose hash was
    /// used as `hSig` when the proof was generated.
    pub fn new_signed(
        inputs: &SpendPublicInputs,
        proof: SpendProof,
        signing_key: &SigningKey,
    ) -> Self {
        let mut tx = Self {
            anchor: fr_to_bytes(&inputs.anchor),
            nullifier: Nullifier::from_field(&inputs.nullifier),
            cm_new1: CoinCommitment::from_field(&inputs.cm_new1),
            cm_new2: CoinCommitment::from_field(&inputs.cm_new2),
            h_sig: fr_to_bytes(&inputs.h_sig),
            h_: fr_to_bytes(&inputs.h_),
            proof,
            pk_sig: signing_key.verifying_key().to_bytes(),
            signature: Vec::new(),
        };
        tx.signature = signing_key.sign(&tx.signable_bytes()).to_bytes().to_vec();
        tx
    }

    /// Everything except the signature, in a fixed order.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(7 * 32 + self.proof.size());
        out.extend_from_slice(&self.anchor);
        out.extend_from_slice(self.nullifier.as_bytes());
        out.extend_from_slice(self.cm_new1.as_bytes());
        out.extend_from_slice(self.cm_new2.as_bytes());
        out.extend_from_slice(&self.h_sig);
        out.extend_from_slice(&self.h_);
        out.extend_from_slice(&self.pk_sig);
        out.extend_from_slice(self.proof.as_bytes());
        out
    }

    /// Transaction id: BLAKE3 over the signed content and signature.
    pub fn id(&self) -> TxId {
        let mut data = b"spend".to_vec();
        data.extend_from_slice(&self.signable_bytes());
        data.extend_from_slice(&self.signature);
        TxId(blake3_hash(&data))
    }

    /// Both output commitments, payment first.
    pub fn new_commitments(&self) -> [CoinCommitment; 2] {
        [self.cm_new1, self.cm_new2]
    }

    /// Decode the proof's public inputs.
    pub fn public_inputs(&self) -> Result<SpendPublicInputs, TransactionError> {
        let field = |bytes: &[u8; 32], name: &'static str| {
            fr_from_bytes(bytes).ok_or(TransactionError::NonCanonicalField(name))
        };
        Ok(SpendPublicInputs {
            anchor: field(&self.anchor, "anchor")?,
            nullifier: field(self.nullifier.as_bytes(), "nullifier")?,
            cm_new1: field(self.cm_new1.as_bytes(), "cm_new1")?,
            cm_new2: field(self.cm_new2.as_bytes(), "cm_new2")?,
            h_sig: field(&self.h_sig, "h_sig")?,
            h_: field(&self.h_, "h_")?,
        })
    }

    /// Check that `hSig` is the hash of `pk_sig` and that the signature is
    /// valid under it.
    pub fn verify_signature(&self) -> Result<(), TransactionError> {
        let vk = VerifyingKey::from_bytes(&self.pk_sig)
            .map_err(|_| TransactionError::InvalidSigningKey)?;

        if fr_to_bytes(&h_sig_of(&vk)) != self.h_sig {
            return Err(TransactionError::HSigMismatch);
        }

        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| TransactionError::InvalidSignature)?;
        vk.verify(&self.signable_bytes(), &signature)
            .map_err(|_| TransactionError::InvalidSignature)
    }

    /// Full check: signature binding plus the zero-knowledge proof.
    pub fn verify(&self, verifier: &SpendVerifier) -> Result<(), TransactionError> {
        self.verify_signature()?;
        let inputs = self.public_inputs()?;
        match verifier.verify(&inputs, &self.proof) {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransactionError::InvalidProof("proof rejected".into())),
            Err(e) => Err(TransactionError::InvalidProof(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_one_time_signing_key;

    fn sample() -> (SpendTransaction, SigningKey) {
        let key = generate_one_time_signing_key();
        let inputs = SpendPublicInputs {
            anchor: Fr::from(1u64),
            nullifier: Fr::from(2u64),
            cm_new1: Fr::from(3u64),
            cm_new2: Fr::from(4u64),
            h_sig: h_sig_of(&key.verifying_key()),
            h_: Fr::from(6u64),
        };
        let tx = SpendTransaction::new_signed(&inputs, SpendProof::from_bytes(&[9; 128]), &key);
        (tx, key)
    }

    #[test]
    fn fresh_spend_signature_verifies() {
        let (tx, _) = sample();
        assert!(tx.verify_signature().is_ok());
        assert_eq!(tx.signature.len(), 64);
    }

    #[test]
    fn public_inputs_round_trip() {
        let (tx, key) = sample();
        let inputs = tx.public_inputs().unwrap();
        assert_eq!(inputs.anchor, Fr::from(1u64));
        assert_eq!(inputs.cm_new2, Fr::from(4u64));
        assert_eq!(inputs.h_sig, h_sig_of(&key.verifying_key()));
    }

    #[test]
    fn tampered_output_breaks_signature() {
        let (mut tx, _) = sample();
        tx.cm_new1 = tx.cm_new2;
        assert_eq!(tx.verify_signature(), Err(TransactionError::InvalidSignature));
    }

    #[test]
    fn swapped_signing_key_breaks_h_sig() {
        let (mut tx, _) = sample();
        let other = generate_one_time_signing_key();
        tx.pk_sig = other.verifying_key().to_bytes();
        tx.signature = other.sign(&tx.signable_bytes()).to_bytes().to_vec();
        assert_eq!(tx.verify_signature(), Err(TransactionError::HSigMismatch));
    }

    #[test]
    fn id_covers_signature() {
        let (tx, _) = sample();
        let mut other = tx.clone();
        other.signature[0] ^= 1;
        assert_ne!(tx.id(), other.id());
        assert_eq!(tx.new_commitments(), [tx.cm_new1, tx.cm_new2]);
    }
}
