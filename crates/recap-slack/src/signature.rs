use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum request age Slack allows before a signed request is considered a
/// replay.
const MAX_SKEW_SECS: i64 = 60 * 5;

/// Verify a Slack request signature: `v0=` + hex HMAC-SHA256 over
/// `v0:{timestamp}:{body}` keyed with the app's signing secret.
pub fn verify(signing_secret: &str, timestamp: &str, body: &[u8], signature: &str) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        return false;
    };
    if (chrono::Utc::now().timestamp() - ts).abs() > MAX_SKEW_SECS {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(signing_secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    let expected = format!("v0={}", hex::encode(mac.finalize().into_bytes()));

    // hmac's verify handles constant-time comparison, but we already have
    // hex strings on both sides; compare byte-wise without early exit.
    let (a, b) = (expected.as_bytes(), signature.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
