//! Random String Generation
//!
//! Cryptographically strong hex strings for CSRF `state` values.

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{ConfigurationError, SdkError, ValidationError};

/// Random string generator interface (for dependency injection).
pub trait RandomStringGenerator: Send + Sync {
    /// Generate a lowercase hex string of exactly `length` characters.
    fn generate(&self, length: usize) -> Result<String, SdkError>;
}

fn validate_length(length: usize) -> Result<(), SdkError> {
    if length < 1 {
        return Err(ValidationError::InvalidLength { length }.into());
    }
    Ok(())
}

fn bytes_for(length: usize) -> Vec<u8> {
    vec![0u8; (length + 1) / 2]
}

fn to_hex(bytes: &[u8], length: usize) -> String {
    let mut encoded = hex::encode(bytes);
    encoded.truncate(length);
    encoded
}

/// Generator backed by the operating system's entropy source.
pub struct OsRandomStringGenerator {
    _private: (),
}

impl OsRandomStringGenerator {
    /// Create the generator, checking the OS source first.
    pub fn new() -> Result<Self, SdkError> {
        let mut sample = [0u8; 1];
        OsRng
            .try_fill_bytes(&mut sample)
            .map_err(|e| ConfigurationError::NoSecureRandomSource {
                message: e.to_string(),
            })?;
        Ok(Self { _private: () })
    }
}

impl RandomStringGenerator for OsRandomStringGenerator {
    fn generate(&self, length: usize) -> Result<String, SdkError> {
        validate_length(length)?;
        let mut bytes = bytes_for(length);
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ConfigurationError::NoSecureRandomSource {
                message: e.to_string(),
            })?;
        Ok(to_hex(&bytes, length))
    }
}

/// Generator backed by the thread-local CSPRNG.
#[derive(Default)]
pub struct ThreadRandomStringGenerator;

impl ThreadRandomStringGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl RandomStringGenerator for ThreadRandomStringGenerator {
    fn generate(&self, length: usize) -> Result<String, SdkError> {
        validate_length(length)?;
        let mut bytes = bytes_for(length);
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(to_hex(&bytes, length))
    }
}

/// Mock random string generator for testing.
#[derive(Default)]
pub struct MockRandomStringGenerator {
    next_value: Mutex<Option<String>>,
    generate_history: Mutex<Vec<usize>>,
}

impl MockRandomStringGenerator {
    /// Create new mock generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the next value to generate.
    pub fn set_next_value(&self, value: impl Into<String>) -> &Self {
        *self.next_value.lock().unwrap() = Some(value.into());
        self
    }

    /// Lengths requested so far.
    pub fn get_generate_history(&self) -> Vec<usize> {
        self.generate_history.lock().unwrap().clone()
    }
}

impl RandomStringGenerator for MockRandomStringGenerator {
    fn generate(&self, length: usize) -> Result<String, SdkError> {
        validate_length(length)?;
        self.generate_history.lock().unwrap().push(length);
        Ok(self
            .next_value
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| "a".repeat(length)))
    }
}

/// Selects a random string generator implementation.
#[derive(Clone, Default)]
pub enum RandomGenerator {
    /// Operating system entropy.
    #[default]
    Os,
    /// Thread-local CSPRNG.
    Thread,
    /// Caller-supplied implementation.
    Custom(Arc<dyn RandomStringGenerator>),
}

impl RandomGenerator {
    /// Select a generator by name.
    pub fn from_name(name: &str) -> Result<Self, SdkError> {
        match name {
            "os" => Ok(Self::Os),
            "thread" => Ok(Self::Thread),
            _ => Err(ConfigurationError::UnknownRandomGenerator {
                name: name.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for RandomGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Os => write!(f, "Os"),
            Self::Thread => write!(f, "Thread"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Create the random string generator for a selection.
pub fn create_random_generator(
    generator: &RandomGenerator,
) -> Result<Arc<dyn RandomStringGenerator>, SdkError> {
    let generator: Arc<dyn RandomStringGenerator> = match generator {
        RandomGenerator::Os => Arc::new(OsRandomStringGenerator::new()?),
        RandomGenerator::Thread => Arc::new(ThreadRandomStringGenerator::new()),
        RandomGenerator::Custom(generator) => Arc::clone(generator),
    };
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    }

    #[test]
    fn test_os_generator_lengths() {
        let generator = OsRandomStringGenerator::new().unwrap();
        for length in [1, 2, 7, 32, 33] {
            let value = generator.generate(length).unwrap();
            assert_eq!(value.len(), length);
            assert!(is_hex(&value));
        }
    }

    #[test]
    fn test_thread_generator_lengths() {
        let generator = ThreadRandomStringGenerator::new();
        let value = generator.generate(32).unwrap();
        assert_eq!(value.len(), 32);
        assert!(is_hex(&value));
        assert_ne!(value, generator.generate(32).unwrap());
    }

    #[test]
    fn test_zero_length_rejected() {
        let generator = ThreadRandomStringGenerator::new();
        assert!(matches!(
            generator.generate(0),
            Err(SdkError::Validation(ValidationError::InvalidLength { length: 0 }))
        ));
    }

    #[test]
    fn test_mock_generator() {
        let generator = MockRandomStringGenerator::new();
        generator.set_next_value("abc123");
        assert_eq!(generator.generate(32).unwrap(), "abc123");
        assert_eq!(generator.generate(4).unwrap(), "aaaa");
        assert_eq!(generator.get_generate_history(), vec![32, 4]);
    }

    #[test]
    fn test_factory_by_name() {
        assert!(matches!(RandomGenerator::from_name("os"), Ok(RandomGenerator::Os)));
        assert!(matches!(
            RandomGenerator::from_name("thread"),
            Ok(RandomGenerator::Thread)
        ));
        assert!(matches!(
            RandomGenerator::from_name("mcrypt"),
            Err(SdkError::Configuration(
                ConfigurationError::UnknownRandomGenerator { .. }
            ))
        ));

        let generator = create_random_generator(&RandomGenerator::Thread).unwrap();
        assert_eq!(generator.generate(8).unwrap().len(), 8);
    }
}
