use std::num::ParseIntError;
use std::str::FromStr;
use std::{array, fmt, io};

use sha2::{Digest, Sha256};

const RAW_LEN: usize = 32;
const STR_LEN: usize = RAW_LEN * 2;

/// A SHA-256 hash, hex-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum {
	#[debug("{self}")]
	bytes: [u8; RAW_LEN],
}

#[derive(Debug, Display, Error)]
pub enum ParseChecksumError {
	#[display("invalid length; expected {STR_LEN} but got {got}")]
	InvalidLength { got: usize },

	#[display("failed to parse hex digit: {_0}")]
	ParseHexDigit(ParseIntError),
}

impl Checksum {
	/// Hashes `bytes` and returns the resulting checksum.
	pub fn from_bytes(bytes: &[u8]) -> Self {
		let mut hasher = Sha256::new();
		hasher.update(bytes);

		Self { bytes: hasher.finalize().into() }
	}

	/// Hashes everything read from `reader` until EOF.
	pub fn from_reader(reader: &mut impl io::Read) -> io::Result<Self> {
		let mut hasher = Sha256::new();
		io::copy(reader, &mut hasher)?;

		Ok(Self { bytes: hasher.finalize().into() })
	}

	/// Returns a hasher that can be fed incrementally and turned into a [`Checksum`] later.
	pub fn hasher() -> ChecksumHasher {
		ChecksumHasher { inner: Sha256::new() }
	}

	/// Raw bytes of this checksum.
	pub fn as_bytes(&self) -> &[u8; RAW_LEN] {
		&self.bytes
	}

	/// Whether this checksum is the empty/unset value (all-zero).
	///
	/// Upstream releases sometimes ship assets without a published checksum; we model that as
	/// an empty string on the wire rather than `Option<Checksum>` to match the legacy schema.
	pub fn is_empty(&self) -> bool {
		self.bytes == [0u8; RAW_LEN]
	}
}

/// Incremental SHA-256 hasher that produces a [`Checksum`].
#[derive(Debug, Default)]
pub struct ChecksumHasher {
	inner: Sha256,
}

impl ChecksumHasher {
	pub fn update(&mut self, bytes: &[u8]) {
		self.inner.update(bytes);
	}

	pub fn finalize(self) -> Checksum {
		Checksum { bytes: self.inner.finalize().into() }
	}
}

impl Default for Checksum {
	fn default() -> Self {
		Self { bytes: [0u8; RAW_LEN] }
	}
}

impl fmt::Display for Checksum {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_empty() {
			return Ok(());
		}

		self.bytes
			.iter()
			.try_for_each(|byte| write!(fmt, "{byte:02x}"))
	}
}

impl FromStr for Checksum {
	type Err = ParseChecksumError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		if value.is_empty() {
			return Ok(Self::default());
		}

		if value.len() != STR_LEN {
			return Err(ParseChecksumError::InvalidLength { got: value.len() });
		}

		Ok(Self {
			bytes: array::try_from_fn(|idx| {
				let substr = value
					.get(idx * 2..(idx + 1) * 2)
					.expect("we checked the input's length");

				u8::from_str_radix(substr, 16).map_err(ParseChecksumError::ParseHexDigit)
			})?,
		})
	}
}

#[cfg(feature = "serde")]
impl serde::Serialize for Checksum {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		format_args!("{self}").serialize(serializer)
	}
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Checksum {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		<String as serde::Deserialize<'de>>::deserialize(deserializer)?
			.parse::<Self>()
			.map_err(|err| match err {
				ParseChecksumError::InvalidLength { got } => {
					serde::de::Error::invalid_length(got, &"0 or 64 hex characters")
				},
				ParseChecksumError::ParseHexDigit(error) => serde::de::Error::custom(error),
			})
	}
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::MySql> for Checksum {
	fn type_info() -> <sqlx::MySql as sqlx::Database>::TypeInfo {
		<String as sqlx::Type<sqlx::MySql>>::type_info()
	}
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::MySql> for Checksum {
	fn decode(
		value: <sqlx::MySql as sqlx::database::HasValueRef<'r>>::ValueRef,
	) -> Result<Self, sqlx::error::BoxDynError> {
		<&str as sqlx::Decode<'r, sqlx::MySql>>::decode(value)?
			.parse()
			.map_err(Into::into)
	}
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::MySql> for Checksum {
	fn encode_by_ref(
		&self,
		buf: &mut <sqlx::MySql as sqlx::database::HasArguments<'q>>::ArgumentBuffer,
	) -> sqlx::encode::IsNull {
		<String as sqlx::Encode<'q, sqlx::MySql>>::encode(self.to_string(), buf)
	}
}

#[cfg(feature = "utoipa")]
impl<'s> utoipa::ToSchema<'s> for Checksum {
	fn schema() -> (&'s str, utoipa::openapi::RefOr<utoipa::openapi::Schema>) {
		(
			"Checksum",
			utoipa::openapi::ObjectBuilder::new()
				.schema_type(utoipa::openapi::SchemaType::String)
				.description(Some("hex-encoded SHA-256, or empty if unpublished"))
				.into(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_hex() {
		let checksum = Checksum::from_bytes(b"hello world");
		let parsed: Checksum = checksum.to_string().parse().unwrap();

		assert_eq!(checksum, parsed);
	}

	#[test]
	fn empty_checksum_round_trips_to_empty_string() {
		let checksum = Checksum::default();

		assert_eq!(checksum.to_string(), "");
		assert_eq!("".parse::<Checksum>().unwrap(), checksum);
	}

	#[test]
	fn rejects_wrong_length() {
		assert!(matches!(
			"deadbeef".parse::<Checksum>(),
			Err(ParseChecksumError::InvalidLength { got: 8 })
		));
	}
}
