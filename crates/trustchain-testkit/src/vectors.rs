//! Golden vectors for canonical encoding, hashing and signing.
//!
//! Any implementation that talks to the ledger must agree on these bytes:
//! the canonical string, its SHA-256, and the deterministic Ed25519
//! signature under the fixed seed [`SEED`].

use trustchain_core::{canonicalize_json, content_hash, Keypair};

/// Seed of the signing key used by every vector.
pub const SEED: [u8; 32] = [0x42; 32];

/// Public key of [`SEED`] as SPKI PEM.
pub const PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MCowBQYDK2VwAyEAIVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=
-----END PUBLIC KEY-----
";

/// Key id of [`SEED`].
pub const KEY_ID: &str = "ed25519-3097e2dee2cb4a34";

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct CanonicalVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input JSON text (arbitrary key order and spacing).
    pub input: &'static str,
    /// Expected canonical string.
    pub canonical: &'static str,
    /// Expected SHA-256 of `canonical` (hex).
    pub sha256: &'static str,
    /// Expected signature over `canonical` (base64).
    pub signature: &'static str,
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<CanonicalVector> {
    vec![
        CanonicalVector {
            name: "empty object",
            input: "{ }",
            canonical: "{}",
            sha256: "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            signature: "PIsRlEoDOpbkMSMUGunXA+xOfs8Wa10rJeHOyKsjO5OT7AqLtsVRY/kRcOljNKI6DKiO/Ih4FsSM2KbDjBPtAQ==",
        },
        CanonicalVector {
            name: "nested key order",
            input: r#"{"c": {"z": true, "y": null}, "b": 2, "a": 1}"#,
            canonical: r#"{"a":1,"b":2,"c":{"y":null,"z":true}}"#,
            sha256: "8de4da99ba10a81ad0712ed5ca145e6017393749463cfdafc1a6b16836ad4d1d",
            signature: "LgdmwfXA95FcmjessBBxtue5cio/X6TGHWDM3Lb693x7RUyAfiFOZGYOckmtoXj2tYXN6q5SQzKJ4+R/Wz5rBA==",
        },
        CanonicalVector {
            name: "array order preserved",
            input: r#"[3, 1, 2, {"b": 1, "a": []}]"#,
            canonical: r#"[3,1,2,{"a":[],"b":1}]"#,
            sha256: "16e202f5a717f66181ab7d70d26e334329c8fdd62afb9683ef459549825e6812",
            signature: "C/Z/FRUfcYaEFp2B+hm9bR7H0MGHLnLjZE76sH+7Jy2sZA9jGy4IInwUxlyMnrk6pUDRUjQwxR/1rYyb4zkrBA==",
        },
        CanonicalVector {
            name: "float layout",
            input: r#"{"x": 1.0, "y": 0.5, "z": 1e21, "w": 1e-7, "v": -0.0}"#,
            canonical: r#"{"v":0,"w":1e-7,"x":1,"y":0.5,"z":1e+21}"#,
            sha256: "0a9670a18d3eeda22cdb747d6ac941a126db57ba2ab1eda48a3094724544707e",
            signature: "vzH/bnlge4GwfKLGuSP3bjNARCgbL2EMUv+rMZ6xE7nOSvm6tb+ziGzH+au0Dq+dw7Fc80k4L0T5lr46ZkviAQ==",
        },
        CanonicalVector {
            name: "string escaping",
            input: r#"{"s": "line\nbreak \"quoted\" tab\t é"}"#,
            canonical: "{\"s\":\"line\\nbreak \\\"quoted\\\" tab\\t \u{e9}\"}",
            sha256: "9e139bb2ddbf4f2823a742325c7b3ff7d790d9bc68dea6b6d741bc5bddd28dd6",
            signature: "5FwDnso1/UJKLT6ORy1zC1IL2G2onh23ulvTxdMoSPGA8+x6jeADGLoFRdmDKJMstEm2VVZjB1bDoYhzGjOcAg==",
        },
        CanonicalVector {
            name: "integer extremes",
            input: r#"{"neg": -42, "big": 18446744073709551615}"#,
            canonical: r#"{"big":18446744073709551615,"neg":-42}"#,
            sha256: "26e5f105926e2a52e1645eb22f66b403123b2753a11f153fbed10855a91e0d7b",
            signature: "VpM1ypiF4EU25vg0RDC0b84IF92H58Nd4EbCMyZLScH+1bgggl3wnk4O1pxgIwj83SBS6Py9LZg8kPFhzdxlAA==",
        },
    ]
}

/// Result of checking one vector.
#[derive(Debug, Clone)]
pub struct VectorResult {
    pub name: &'static str,
    pub canonical: String,
    pub sha256: String,
    pub signature: String,
}

impl VectorResult {
    /// Whether every output matches the vector.
    pub fn matches(&self, vector: &CanonicalVector) -> bool {
        self.canonical == vector.canonical
            && self.sha256 == vector.sha256
            && self.signature == vector.signature
    }
}

/// Run one vector through this implementation.
pub fn compute(vector: &CanonicalVector) -> VectorResult {
    let value: serde_json::Value = serde_json::from_str(vector.input).unwrap_or_default();
    let canonical = canonicalize_json(&value);
    let keypair = Keypair::from_seed(&SEED);
    VectorResult {
        name: vector.name,
        sha256: content_hash(&canonical).to_hex(),
        signature: keypair.sign(canonical.as_bytes()).to_base64(),
        canonical,
    }
}

/// Run every vector, returning `(name, matches)` pairs.
pub fn verify_all_vectors() -> Vec<(&'static str, bool)> {
    all_vectors()
        .iter()
        .map(|v| (v.name, compute(v).matches(v)))
        .collect()
}
