//! Type aliases for domain concepts.

/// A website service name (e.g. `apache`, `iis`).
pub type ServiceName = String;

/// An ASCII-armored age ciphertext.
pub type Ciphertext = String;

/// A provider-side instance name, `{company}-{env}-{role}`.
pub type InstanceName = String;
