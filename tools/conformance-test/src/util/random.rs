use rand::distributions::Uniform;
use rand::Rng;

pub fn random_u32() -> u32 {
    let mut rng = rand::thread_rng();
    rng.gen()
}

pub fn random_u64() -> u64 {
    let mut rng = rand::thread_rng();
    rng.gen()
}

/// A string of `len` random lowercase ASCII letters.
pub fn random_lowercase_string(len: usize) -> String {
    let letters = Uniform::new_inclusive(b'a', b'z');

    rand::thread_rng()
        .sample_iter(letters)
        .take(len)
        .map(char::from)
        .collect()
}

/// A hex string of 64 random bits.
pub fn random_hex_string() -> String {
    format!("{:X}", random_u64())
}
