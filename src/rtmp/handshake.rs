// RTMP handshake (C0/C1/C2 <-> S0/S1/S2)

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::{RtmpError, RtmpResult};
use crate::rtmp::constants::{
    CLIENT_KEY_LEN, GENUINE_FMS_KEY, GENUINE_FP_KEY, RTMP_SIG_SIZE, RTMP_VERSION,
    SERVER_FULL_KEY_LEN, SERVER_KEY_LEN, SHA256_DIGEST_LENGTH,
};

type HmacSha256 = Hmac<Sha256>;

fn calc_hmac(message: &[u8], key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Offset of the `[4..8]` "zero" field used to choose the simple vs digest path.
fn is_simple_handshake(client_signature: &[u8]) -> bool {
    client_signature[4..8] == [0, 0, 0, 0]
}

/// Computes the digest position for a given scheme base, per the formula
/// `base + 4 + (sum of 4 bytes at [base..base+4]) mod 728`.
fn digest_position(buffer: &[u8], base: usize) -> usize {
    let sum: u32 = buffer[base..base + 4].iter().map(|&b| b as u32).sum();
    base + 4 + (sum as usize % 728)
}

/// Removes the 32-byte digest at `digest_pos` from `buffer`, returning the
/// message that was actually HMAC'd.
fn message_with_digest_removed(buffer: &[u8], digest_pos: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len() - SHA256_DIGEST_LENGTH);
    out.extend_from_slice(&buffer[..digest_pos]);
    out.extend_from_slice(&buffer[digest_pos + SHA256_DIGEST_LENGTH..]);
    out
}

/// Tries one digest scheme against C1; returns the extracted digest on a match.
fn try_scheme(client_signature: &[u8], base: usize) -> Option<Vec<u8>> {
    let digest_pos = digest_position(client_signature, base);
    if digest_pos + SHA256_DIGEST_LENGTH > client_signature.len() {
        return None;
    }

    let digest = &client_signature[digest_pos..digest_pos + SHA256_DIGEST_LENGTH];
    let message = message_with_digest_removed(client_signature, digest_pos);
    let computed = calc_hmac(&message, &GENUINE_FP_KEY[..CLIENT_KEY_LEN]);

    if computed == digest {
        Some(digest.to_vec())
    } else {
        None
    }
}

/// Scheme 0 (offset base 8) is tried before scheme 1 (offset base 772).
///
/// Returns the matched scheme index and the client's extracted digest.
fn detect_client_message_format(client_signature: &[u8]) -> RtmpResult<(u32, Vec<u8>)> {
    if let Some(digest) = try_scheme(client_signature, 8) {
        return Ok((0, digest));
    }

    if let Some(digest) = try_scheme(client_signature, 772) {
        return Ok((1, digest));
    }

    Err(RtmpError::HandshakeFailed(
        "neither digest scheme validated C1".to_string(),
    ))
}

fn generate_s1(scheme: u32) -> Vec<u8> {
    let base = if scheme == 0 { 8 } else { 772 };

    let mut buf = vec![0u8; RTMP_SIG_SIZE];
    buf[4..8].copy_from_slice(&[4, 5, 0, 1]);
    rand::rng().fill_bytes(&mut buf[8..]);

    let digest_pos = digest_position(&buf, base);
    let message = message_with_digest_removed(&buf, digest_pos);
    let digest = calc_hmac(&message, &GENUINE_FMS_KEY[..SERVER_KEY_LEN]);
    buf[digest_pos..digest_pos + SHA256_DIGEST_LENGTH].copy_from_slice(&digest);

    buf
}

fn generate_s2(client_digest: &[u8]) -> Vec<u8> {
    let mut random_bytes = vec![0u8; RTMP_SIG_SIZE - SHA256_DIGEST_LENGTH];
    rand::rng().fill_bytes(&mut random_bytes);

    let challenge_key = calc_hmac(client_digest, &GENUINE_FMS_KEY[..SERVER_FULL_KEY_LEN]);
    let signature = calc_hmac(&random_bytes, &challenge_key);

    let mut out = random_bytes;
    out.extend_from_slice(&signature);
    out
}

/// Given a full C1 signature (1536 bytes), produces the S0+S1+S2 bytes to
/// send back to the peer.
pub fn generate_s0_s1_s2(client_signature: &[u8]) -> RtmpResult<Vec<u8>> {
    if client_signature.len() != RTMP_SIG_SIZE {
        return Err(RtmpError::HandshakeFailed(format!(
            "C1 must be {RTMP_SIG_SIZE} bytes, got {}",
            client_signature.len()
        )));
    }

    let mut out = Vec::with_capacity(1 + RTMP_SIG_SIZE * 2);
    out.push(RTMP_VERSION);

    if is_simple_handshake(client_signature) {
        out.extend_from_slice(client_signature);
        out.extend_from_slice(client_signature);
        return Ok(out);
    }

    let (scheme, client_digest) = detect_client_message_format(client_signature)?;
    out.extend_from_slice(&generate_s1(scheme));
    out.extend_from_slice(&generate_s2(&client_digest));

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_path_echoes_c1() {
        let mut c1 = vec![0u8; RTMP_SIG_SIZE];
        c1[4..8].copy_from_slice(&[0, 0, 0, 0]);
        let s0s1s2 = generate_s0_s1_s2(&c1).unwrap();

        assert_eq!(s0s1s2[0], RTMP_VERSION);
        assert_eq!(&s0s1s2[1..1 + RTMP_SIG_SIZE], &c1[..]);
        assert_eq!(&s0s1s2[1 + RTMP_SIG_SIZE..], &c1[..]);
    }

    #[test]
    fn digest_path_tries_scheme_zero_first() {
        // Build a C1 whose scheme-0 digest is valid, to confirm the
        // implementation accepts and does not fall through to scheme 1.
        let mut c1 = vec![0u8; RTMP_SIG_SIZE];
        c1[4..8].copy_from_slice(&[9, 0, 0, 1]); // non-zero => digest path
        rand::rng().fill_bytes(&mut c1[8..]);

        let digest_pos = digest_position(&c1, 8);
        let message = message_with_digest_removed(&c1, digest_pos);
        let digest = calc_hmac(&message, &GENUINE_FP_KEY[..CLIENT_KEY_LEN]);
        c1[digest_pos..digest_pos + SHA256_DIGEST_LENGTH].copy_from_slice(&digest);

        let result = generate_s0_s1_s2(&c1);
        assert!(result.is_ok());
    }

    #[test]
    fn malformed_digest_fails_handshake() {
        let mut c1 = vec![0u8; RTMP_SIG_SIZE];
        c1[4..8].copy_from_slice(&[1, 2, 3, 4]);
        rand::rng().fill_bytes(&mut c1[8..]);

        assert!(matches!(
            generate_s0_s1_s2(&c1),
            Err(RtmpError::HandshakeFailed(_))
        ));
    }
}
