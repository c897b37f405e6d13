//! TLS trust policy for Postgres connections.
//!
//! Turning an `sslmode` plus the `ssl*` connection parameters into a TLS client
//! configuration happens in two steps:
//!
//! 1. [`TlsPolicy::build`] decides *what* to do: whether the server
//!    certificate is verified, whether the host name is checked, which root
//!    certificate, CRL and client certificate to use, and the protocol
//!    version bounds. No files are read here.
//! 2. [`TlsConfig::from_policy`] loads the referenced files and produces a
//!    rustls `ClientConfig`.

use super::verify::{ChainOnlyVerification, NoVerification};
use crate::{Error, Result};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use rustls_pki_types::{
    CertificateDer, CertificateRevocationListDer, PrivateKeyDer, PrivatePkcs8KeyDer,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default root certificate file name inside the Postgres config directory
pub const DEFAULT_ROOT_CERT: &str = "root.crt";
/// Default CRL file name
pub const DEFAULT_CRL: &str = "root.crl";
/// Default client certificate file name
pub const DEFAULT_CLIENT_CERT: &str = "postgresql.crt";
/// Default client key file name
pub const DEFAULT_CLIENT_KEY: &str = "postgresql.key";

/// SSL/TLS connection mode matching PostgreSQL `sslmode` parameter.
///
/// Modes are totally ordered by strictness, `Disable` being the weakest.
/// The order is defined by [`SslMode::rank`], not by declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No TLS (plaintext connection)
    Disable,
    /// Try plaintext first, TLS if the server insists; certificate not verified
    Allow,
    /// Try TLS first, fall back to plaintext; certificate not verified
    #[default]
    Prefer,
    /// TLS required; certificate verified only if a root certificate is available
    Require,
    /// TLS required, server certificate must be signed by a trusted CA
    VerifyCa,
    /// TLS required, server certificate must be signed by a trusted CA and hostname must match
    VerifyFull,
}

impl SslMode {
    /// All modes from weakest to strictest
    pub const ALL: [SslMode; 6] = [
        SslMode::Disable,
        SslMode::Allow,
        SslMode::Prefer,
        SslMode::Require,
        SslMode::VerifyCa,
        SslMode::VerifyFull,
    ];

    /// Strictness rank, `0` for `Disable`
    pub const fn rank(self) -> u8 {
        match self {
            Self::Disable => 0,
            Self::Allow => 1,
            Self::Prefer => 2,
            Self::Require => 3,
            Self::VerifyCa => 4,
            Self::VerifyFull => 5,
        }
    }

    /// Whether this mode requires certificate verification (CA or full)
    pub fn requires_verification(&self) -> bool {
        *self >= Self::VerifyCa
    }

    /// The `sslmode` keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Allow => "allow",
            Self::Prefer => "prefer",
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }
}

impl PartialOrd for SslMode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SslMode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "disable" => Ok(Self::Disable),
            "allow" => Ok(Self::Allow),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            "verify-ca" => Ok(Self::VerifyCa),
            "verify-full" => Ok(Self::VerifyFull),
            _ => Err(Error::Config(format!(
                "invalid sslmode '{}': expected disable, allow, prefer, require, verify-ca, or verify-full",
                s
            ))),
        }
    }
}

/// TLS protocol version bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls1_0,
    /// TLS 1.1
    Tls1_1,
    /// TLS 1.2
    Tls1_2,
    /// TLS 1.3
    Tls1_3,
}

impl TlsVersion {
    /// Parse a protocol version such as `TLSv1.2`.
    ///
    /// `.` and `_` are interchangeable and the `v` is optional, so `TLSv1.2`,
    /// `TLSv1_2` and `TLS1_2` are the same version. `MINIMUM_SUPPORTED` and
    /// `MAXIMUM_SUPPORTED` name the bounds of what rustls implements.
    ///
    /// # Errors
    ///
    /// Legacy `SSL*` versions fail with [`Error::UnsupportedTlsVersion`],
    /// anything else unrecognized with [`Error::UnknownTlsVersion`].
    pub fn parse(version: &str) -> Result<Self> {
        if version.starts_with("SSL") {
            return Err(Error::UnsupportedTlsVersion(version.to_string()));
        }

        let normalized = version.replace('.', "_");
        let token = normalized
            .strip_prefix("TLSv")
            .or_else(|| normalized.strip_prefix("TLS"));

        match (normalized.as_str(), token) {
            ("MINIMUM_SUPPORTED", _) => Ok(Self::Tls1_2),
            ("MAXIMUM_SUPPORTED", _) => Ok(Self::Tls1_3),
            (_, Some("1" | "1_0")) => Ok(Self::Tls1_0),
            (_, Some("1_1")) => Ok(Self::Tls1_1),
            (_, Some("1_2")) => Ok(Self::Tls1_2),
            (_, Some("1_3")) => Ok(Self::Tls1_3),
            _ => Err(Error::UnknownTlsVersion(version.to_string())),
        }
    }

    fn rustls_version(self) -> Option<&'static SupportedProtocolVersion> {
        match self {
            Self::Tls1_2 => Some(&rustls::version::TLS12),
            Self::Tls1_3 => Some(&rustls::version::TLS13),
            Self::Tls1_0 | Self::Tls1_1 => None,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls1_0 => write!(f, "TLSv1"),
            Self::Tls1_1 => write!(f, "TLSv1.1"),
            Self::Tls1_2 => write!(f, "TLSv1.2"),
            Self::Tls1_3 => write!(f, "TLSv1.3"),
        }
    }
}

/// `ssl*` connection parameters, as given in the connection string or
/// environment
#[derive(Default, Clone, PartialEq, Eq)]
pub struct SslParameters {
    /// Client certificate (`sslcert`)
    pub cert: Option<PathBuf>,
    /// Client private key (`sslkey`)
    pub key: Option<PathBuf>,
    /// Passphrase for the client key (`sslpassword`)
    pub password: Option<String>,
    /// Root certificate (`sslrootcert`)
    pub rootcert: Option<PathBuf>,
    /// Certificate revocation list (`sslcrl`)
    pub crl: Option<PathBuf>,
    /// Minimum protocol version (`ssl_min_protocol_version`)
    pub min_protocol_version: Option<String>,
    /// Maximum protocol version (`ssl_max_protocol_version`)
    pub max_protocol_version: Option<String>,
}

impl SslParameters {
    /// Fill in default file locations and drop files that do not exist.
    ///
    /// Root certificate and CRL only apply from `require` up. Unset paths
    /// default to the well-known names inside `postgres_dir`. A path that
    /// does not exist is treated as not given.
    pub fn resolve_paths(&self, mode: SslMode, postgres_dir: Option<&Path>) -> SslParameters {
        let pick = |given: &Option<PathBuf>, default_name: &str| -> Option<PathBuf> {
            given
                .clone()
                .or_else(|| postgres_dir.map(|dir| dir.join(default_name)))
                .filter(|path| path.exists())
        };

        let (rootcert, crl) = if mode >= SslMode::Require {
            (
                pick(&self.rootcert, DEFAULT_ROOT_CERT),
                pick(&self.crl, DEFAULT_CRL),
            )
        } else {
            (None, None)
        };

        SslParameters {
            cert: pick(&self.cert, DEFAULT_CLIENT_CERT),
            key: pick(&self.key, DEFAULT_CLIENT_KEY),
            password: self.password.clone(),
            rootcert,
            crl,
            min_protocol_version: self.min_protocol_version.clone(),
            max_protocol_version: self.max_protocol_version.clone(),
        }
    }
}

impl fmt::Debug for SslParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SslParameters")
            .field("cert", &self.cert)
            .field("key", &self.key)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("rootcert", &self.rootcert)
            .field("crl", &self.crl)
            .field("min_protocol_version", &self.min_protocol_version)
            .field("max_protocol_version", &self.max_protocol_version)
            .finish()
    }
}

/// Client certificate used for mutual TLS
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    /// Certificate chain (PEM)
    pub cert: PathBuf,
    /// Private key (PEM, possibly encrypted PKCS#8)
    pub key: PathBuf,
    /// Key passphrase, empty when none was given
    pub passphrase: String,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("cert", &self.cert)
            .field("key", &self.key)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Decisions derived from an `sslmode` and the `ssl*` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    mode: SslMode,
    verify_peer: bool,
    verify_hostname: bool,
    root_cert: Option<PathBuf>,
    crl: Option<PathBuf>,
    client_cert: Option<ClientCertificate>,
    min_version: Option<TlsVersion>,
    max_version: Option<TlsVersion>,
}

impl TlsPolicy {
    /// Derive the policy for `mode`.
    ///
    /// Returns `Ok(None)` for `disable`. `allow` and `prefer` never verify.
    /// `require` verifies the chain only when a root certificate is given.
    /// `verify-ca` and `verify-full` need a root certificate; only
    /// `verify-full` checks the host name. Paths are taken as given, see
    /// [`SslParameters::resolve_paths`] for defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingRootCert`] for `verify-ca`/`verify-full` without a root certificate
    /// - [`Error::UnsupportedTlsVersion`] / [`Error::UnknownTlsVersion`] for bad version bounds
    pub fn build(mode: SslMode, params: &SslParameters) -> Result<Option<Self>> {
        if mode == SslMode::Disable {
            return Ok(None);
        }

        let root_cert = if mode >= SslMode::Require {
            match &params.rootcert {
                Some(path) => Some(path.clone()),
                None if mode.requires_verification() => {
                    return Err(Error::MissingRootCert(mode));
                }
                None => None,
            }
        } else {
            None
        };
        let verify_peer = root_cert.is_some();
        let crl = params.crl.clone().filter(|_| verify_peer);

        let client_cert = match (&params.cert, &params.key) {
            (Some(cert), Some(key)) => Some(ClientCertificate {
                cert: cert.clone(),
                key: key.clone(),
                passphrase: params.password.clone().unwrap_or_default(),
            }),
            _ => None,
        };

        let min_version = params
            .min_protocol_version
            .as_deref()
            .map(TlsVersion::parse)
            .transpose()?;
        let max_version = params
            .max_protocol_version
            .as_deref()
            .map(TlsVersion::parse)
            .transpose()?;

        let policy = Self {
            mode,
            verify_peer,
            verify_hostname: mode >= SslMode::VerifyFull,
            root_cert,
            crl,
            client_cert,
            min_version,
            max_version,
        };

        tracing::debug!(
            sslmode = %mode,
            verify_peer = policy.verify_peer,
            verify_hostname = policy.verify_hostname,
            crl = policy.crl.is_some(),
            client_cert = policy.client_cert.is_some(),
            "built TLS policy"
        );
        crate::metrics::counters::tls_policy_built(mode);

        Ok(Some(policy))
    }

    /// The mode this policy was built for
    pub fn mode(&self) -> SslMode {
        self.mode
    }

    /// Whether the server certificate chain is verified
    pub fn verify_peer(&self) -> bool {
        self.verify_peer
    }

    /// Whether the server host name must match the certificate
    pub fn verify_hostname(&self) -> bool {
        self.verify_hostname
    }

    /// Trust anchor, present whenever the peer is verified
    pub fn root_cert(&self) -> Option<&Path> {
        self.root_cert.as_deref()
    }

    /// CRL, checked for the full chain
    pub fn crl(&self) -> Option<&Path> {
        self.crl.as_deref()
    }

    /// Client certificate for mutual TLS
    pub fn client_cert(&self) -> Option<&ClientCertificate> {
        self.client_cert.as_ref()
    }

    /// Lowest protocol version allowed
    pub fn min_version(&self) -> Option<TlsVersion> {
        self.min_version
    }

    /// Highest protocol version allowed
    pub fn max_version(&self) -> Option<TlsVersion> {
        self.max_version
    }

    /// rustls protocol versions within the configured bounds.
    ///
    /// rustls only implements TLS 1.2 and 1.3; bounds that exclude both are
    /// an error.
    fn protocol_versions(&self) -> Result<Vec<&'static SupportedProtocolVersion>> {
        let versions: Vec<_> = [TlsVersion::Tls1_2, TlsVersion::Tls1_3]
            .into_iter()
            .filter(|v| self.min_version.map_or(true, |min| *v >= min))
            .filter(|v| self.max_version.map_or(true, |max| *v <= max))
            .filter_map(TlsVersion::rustls_version)
            .collect();

        if versions.is_empty() {
            return Err(Error::Config(format!(
                "no supported TLS protocol version between {} and {}",
                self.min_version
                    .map_or_else(|| "any".to_string(), |v| v.to_string()),
                self.max_version
                    .map_or_else(|| "any".to_string(), |v| v.to_string()),
            )));
        }
        Ok(versions)
    }
}

/// TLS policy materialized as a rustls client configuration.
#[derive(Clone)]
pub struct TlsConfig {
    policy: TlsPolicy,
    /// Compiled rustls ClientConfig
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Load the files named by `policy` and build the rustls configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the root certificate, CRL, client certificate or key cannot be read or parsed
    /// - an encrypted client key cannot be decrypted with the passphrase
    /// - the protocol version bounds exclude every version rustls supports
    pub fn from_policy(policy: TlsPolicy) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let versions = policy.protocol_versions()?;
        let builder =
            ClientConfig::builder_with_provider(provider.clone()).with_protocol_versions(&versions)?;

        let builder = match policy.root_cert.as_deref().filter(|_| policy.verify_peer) {
            Some(root_path) => {
                let verifier = build_webpki_verifier(root_path, policy.crl.as_deref(), &provider)?;
                if policy.verify_hostname {
                    builder.with_webpki_verifier(verifier)
                } else {
                    builder
                        .dangerous()
                        .with_custom_certificate_verifier(Arc::new(ChainOnlyVerification::new(
                            verifier,
                        )))
                }
            }
            None => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerification::new(provider.clone()))),
        };

        let client_config = match &policy.client_cert {
            Some(client) => {
                let certs = load_certificates(&client.cert)?;
                if certs.is_empty() {
                    return Err(Error::Config(format!(
                        "No valid certificates found in '{}'",
                        client.cert.display()
                    )));
                }
                let key = load_private_key(&client.key, &client.passphrase)?;
                builder.with_client_auth_cert(certs, key)?
            }
            None => builder.with_no_client_auth(),
        };

        Ok(Self {
            policy,
            client_config: Arc::new(client_config),
        })
    }

    /// The policy this configuration implements
    pub fn policy(&self) -> &TlsPolicy {
        &self.policy
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// The `sslmode` in effect
    pub fn mode(&self) -> SslMode {
        self.policy.mode
    }

    /// Check if the server certificate is verified.
    pub fn verify_peer(&self) -> bool {
        self.policy.verify_peer
    }

    /// Check if hostname verification is enabled.
    pub fn verify_hostname(&self) -> bool {
        self.policy.verify_hostname
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("policy", &self.policy)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read {} file '{}': {}",
            what,
            path.display(),
            e
        ))
    })
}

/// Webpki verifier trusting the certificates in `root_path`, checking
/// revocation for the whole chain when a CRL is given.
fn build_webpki_verifier(
    root_path: &Path,
    crl_path: Option<&Path>,
    provider: &Arc<CryptoProvider>,
) -> Result<Arc<WebPkiServerVerifier>> {
    let roots = load_root_store(root_path)?;
    let crls = match crl_path {
        Some(path) => load_crls(path)?,
        None => Vec::new(),
    };

    WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .with_crls(crls)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build certificate verifier: {}", e)))
}

/// Load a root certificate store from a PEM file.
fn load_root_store(path: &Path) -> Result<RootCertStore> {
    let mut root_store = RootCertStore::empty();
    for cert in load_certificates(path)? {
        root_store.add(cert).map_err(|e| {
            Error::Config(format!(
                "Invalid CA certificate in '{}': {}",
                path.display(),
                e
            ))
        })?;
    }

    if root_store.is_empty() {
        return Err(Error::Config(format!(
            "No valid certificates found in '{}'",
            path.display()
        )));
    }
    Ok(root_store)
}

fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let data = read_file(path, "certificate")?;
    rustls_pemfile::certs(&mut Cursor::new(&data))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::Config(format!(
                "Failed to parse certificate from '{}': {}",
                path.display(),
                e
            ))
        })
}

/// Load CRLs from a PEM file, falling back to a single DER-encoded CRL.
fn load_crls(path: &Path) -> Result<Vec<CertificateRevocationListDer<'static>>> {
    let data = read_file(path, "CRL")?;
    let crls = rustls_pemfile::crls(&mut Cursor::new(&data))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::Config(format!(
                "Failed to parse CRL from '{}': {}",
                path.display(),
                e
            ))
        })?;

    if crls.is_empty() {
        return Ok(vec![CertificateRevocationListDer::from(data)]);
    }
    Ok(crls)
}

/// Load the client private key, decrypting PKCS#8 keys with `passphrase`.
fn load_private_key(path: &Path, passphrase: &str) -> Result<PrivateKeyDer<'static>> {
    let data = read_file(path, "private key")?;

    let key = rustls_pemfile::private_key(&mut Cursor::new(&data)).map_err(|e| {
        Error::Config(format!(
            "Failed to parse private key from '{}': {}",
            path.display(),
            e
        ))
    })?;
    if let Some(key) = key {
        return Ok(key);
    }

    let (label, der) = pkcs8::der::pem::decode_vec(&data).map_err(|_| {
        Error::Config(format!("No private key found in '{}'", path.display()))
    })?;
    if label != "ENCRYPTED PRIVATE KEY" {
        return Err(Error::Config(format!(
            "Unsupported private key format '{}' in '{}'",
            label,
            path.display()
        )));
    }

    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(der.as_slice()).map_err(|e| {
        Error::Config(format!(
            "Invalid encrypted private key in '{}': {}",
            path.display(),
            e
        ))
    })?;
    let decrypted = encrypted.decrypt(passphrase).map_err(|_| {
        Error::Config(format!(
            "Failed to decrypt private key '{}': wrong passphrase?",
            path.display()
        ))
    })?;

    Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        decrypted.as_bytes().to_vec(),
    )))
}
