//! WPA2-PSK key derivation and CCMP unwrap used by the decryption stage.
//! The original relies on `libtins`' `Tins::Crypto::WPA2Decrypter`;
//! this module reimplements the same 802.11i derivation directly against
//! RustCrypto primitives (`pbkdf2`/`hmac`/`sha1`/`aes`/`ccm`), the same
//! crate family already used elsewhere for hashing and AEAD.

use aes::Aes128;
use ccm::aead::generic_array::GenericArray;
use ccm::aead::{AeadInPlace, KeyInit};
use ccm::consts::{U13, U8};
use ccm::Ccm;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;
/// CCMP-128: 8-byte MIC, 13-byte nonce, as specified for 802.11 data
/// confidentiality (IEEE 802.11-2016 §12.5.3).
type Ccmp128 = Ccm<Aes128, U8, U13>;

/// PSK -> PMK via PBKDF2-HMAC-SHA1, 4096 iterations, SSID as salt
/// (IEEE 802.11i §8.5.1.1 / RFC 2898).
pub fn derive_pmk(passphrase: &str, ssid: &str) -> [u8; 32] {
    let mut pmk = [0u8; 32];
    pbkdf2_hmac::<Sha1>(passphrase.as_bytes(), ssid.as_bytes(), 4096, &mut pmk);
    pmk
}

/// The four keys the pairwise key hierarchy produces; only `tk` is needed
/// to unwrap CCMP data, but the others are kept for completeness/tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ptk {
    pub kck: [u8; 16],
    pub kek: [u8; 16],
    pub tk: [u8; 16],
}

/// PMK + both stations' MACs and nonces -> PTK, via the 802.11i PRF-384
/// (IEEE 802.11i §8.5.1.2, Appendix H). `aa`/`spa` are the AP's and
/// supplicant's MAC addresses; `anonce`/`snonce` come from EAPOL-Key
/// messages 1 and 2 of the 4-way handshake.
pub fn derive_ptk(pmk: &[u8; 32], aa: &[u8; 6], spa: &[u8; 6], anonce: &[u8; 32], snonce: &[u8; 32]) -> Ptk {
    let (min_mac, max_mac) = if aa <= spa { (aa, spa) } else { (spa, aa) };
    let (min_nonce, max_nonce) = if anonce <= snonce {
        (anonce, snonce)
    } else {
        (snonce, anonce)
    };

    let mut data = Vec::with_capacity(6 + 6 + 32 + 32);
    data.extend_from_slice(min_mac);
    data.extend_from_slice(max_mac);
    data.extend_from_slice(min_nonce);
    data.extend_from_slice(max_nonce);

    let expanded = prf(pmk, b"Pairwise key expansion", &data, 48);
    Ptk {
        kck: expanded[0..16].try_into().unwrap(),
        kek: expanded[16..32].try_into().unwrap(),
        tk: expanded[32..48].try_into().unwrap(),
    }
}

/// IEEE 802.11i PRF: `R = R || HMAC-SHA1(key, label || 0x00 || data || i)`
/// for increasing `i`, truncated to `out_len` bytes.
fn prf(key: &[u8], label: &[u8], data: &[u8], out_len: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(out_len + 20);
    let mut counter: u8 = 0;
    while output.len() < out_len {
        let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key length");
        mac.update(label);
        mac.update(&[0x00]);
        mac.update(data);
        mac.update(&[counter]);
        output.extend_from_slice(&mac.finalize().into_bytes());
        counter += 1;
    }
    output.truncate(out_len);
    output
}

/// Reconstructs the 13-byte CCMP nonce: priority || A2 (transmitter
/// address) || PN (big-endian packet number), per IEEE 802.11-2016
/// §12.5.3.3.3.
fn ccmp_nonce(priority: u8, a2: &[u8; 6], pn: u64) -> [u8; 13] {
    let mut nonce = [0u8; 13];
    nonce[0] = priority;
    nonce[1..7].copy_from_slice(a2);
    let pn_bytes = pn.to_be_bytes();
    nonce[7..13].copy_from_slice(&pn_bytes[2..8]);
    nonce
}

/// Unwraps one CCMP-protected MPDU payload in place. `aad` is the
/// additional authenticated data built from the (masked) MAC header per
/// §12.5.3.3.4; `ciphertext` is the payload following the 8-byte CCMP
/// header, MIC included. Returns the plaintext with the 8-byte MIC
/// stripped, or `Err` on MIC mismatch.
pub fn ccmp_decrypt(
    tk: &[u8; 16],
    priority: u8,
    a2: &[u8; 6],
    pn: u64,
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, ()> {
    if ciphertext.len() < 8 {
        return Err(());
    }
    let cipher = Ccmp128::new(GenericArray::from_slice(tk));
    let nonce = ccmp_nonce(priority, a2, pn);
    let split = ciphertext.len() - 8;
    let mut buffer = ciphertext[..split].to_vec();
    let tag = GenericArray::clone_from_slice(&ciphertext[split..]);
    cipher
        .decrypt_in_place_detached(GenericArray::from_slice(&nonce), aad, &mut buffer, &tag)
        .map_err(|_| ())?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pmk_is_deterministic_and_32_bytes() {
        let a = derive_pmk("abcdefgh", "foo");
        let b = derive_pmk("abcdefgh", "foo");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn different_passphrases_yield_different_pmks() {
        let a = derive_pmk("abcdefgh", "foo");
        let b = derive_pmk("different", "foo");
        assert_ne!(a, b);
    }

    #[test]
    fn ptk_derivation_is_symmetric_in_mac_and_nonce_order() {
        let pmk = derive_pmk("abcdefgh", "foo");
        let aa = [0xaa; 6];
        let spa = [0xbb; 6];
        let anonce = [0x11u8; 32];
        let snonce = [0x22u8; 32];

        let ptk1 = derive_ptk(&pmk, &aa, &spa, &anonce, &snonce);
        let ptk2 = derive_ptk(&pmk, &spa, &aa, &snonce, &anonce);
        assert_eq!(ptk1, ptk2);
    }
}
