//! The handle contract: a snapshot view over a fetched tile.
//!
//! A handle's observable state never changes after construction (§3), so
//! every concrete handle here is built fully-formed; there is no
//! `Handle::refresh` or similar.

use tilestore_core::Blob;

/// A snapshot view over a fetched tile: existence, timestamp, data, expiry.
/// Modeled as a trait object rather than a closed enum because §9 expects
/// third-party backends to add their own variants (the `hss` collaborator
/// mentioned in §2 is one such variant this crate does not implement).
pub trait Handle: Send + Sync {
	fn exists(&self) -> bool;
	/// Unix timestamp; the epoch if `!exists()`.
	fn last_modified(&self) -> i64;
	fn data(&self) -> Option<&[u8]>;
	fn expired(&self) -> bool;
}

/// The "not found" handle: `exists() == false`, data and expiry are the
/// contract-mandated defaults.
pub struct NullHandle;

impl Handle for NullHandle {
	fn exists(&self) -> bool {
		false
	}

	fn last_modified(&self) -> i64 {
		0
	}

	fn data(&self) -> Option<&[u8]> {
		None
	}

	fn expired(&self) -> bool {
		false
	}
}

#[must_use]
pub fn null_handle() -> Box<dyn Handle> {
	Box::new(NullHandle)
}

/// A handle that owns its tile bytes — the common case for a backend that
/// actually found something: the disk backend's per-tile view, and the
/// compositing backend's synthesized result.
pub struct OwnedHandle {
	data: Blob,
	last_modified: i64,
	expired: bool,
}

impl OwnedHandle {
	#[must_use]
	pub fn new(data: Blob, last_modified: i64, expired: bool) -> OwnedHandle {
		OwnedHandle { data, last_modified, expired }
	}
}

impl Handle for OwnedHandle {
	fn exists(&self) -> bool {
		true
	}

	fn last_modified(&self) -> i64 {
		self.last_modified
	}

	fn data(&self) -> Option<&[u8]> {
		Some(self.data.as_slice())
	}

	fn expired(&self) -> bool {
		self.expired
	}
}

/// Wraps a child handle, forwarding everything but `expired()`, which is
/// overridden by the expiry-overlay backend's authoritative source.
pub struct OverlayHandle {
	inner: Box<dyn Handle>,
	expired: bool,
}

impl OverlayHandle {
	#[must_use]
	pub fn new(inner: Box<dyn Handle>, expired: bool) -> OverlayHandle {
		OverlayHandle { inner, expired }
	}
}

impl Handle for OverlayHandle {
	fn exists(&self) -> bool {
		self.inner.exists()
	}

	fn last_modified(&self) -> i64 {
		self.inner.last_modified()
	}

	fn data(&self) -> Option<&[u8]> {
		self.inner.data()
	}

	fn expired(&self) -> bool {
		self.expired
	}
}
