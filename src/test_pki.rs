//! Test-only PKI: a throwaway CA with one server and one client leaf,
//! written out as PEM files the way a deployment would provide them.

use std::fs;
use std::path::Path;

use rcgen::{BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair};
use tempfile::TempDir;

use crate::config::{TlsSettings, TrustPool};

pub struct TestPki {
    /// Holds the PEM files alive for the duration of the test
    pub dir: TempDir,
    /// Server-side trust material (cert/key + CA pool)
    pub server: TlsSettings,
    /// Client-side trust material (identity + CA pool)
    pub client: TlsSettings,
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .unwrap();
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let server_cert = server_params
            .signed_by(&server_key, &ca_cert, &ca_key)
            .unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(vec!["client.test".to_string()]).unwrap();
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client_cert = client_params
            .signed_by(&client_key, &ca_cert, &ca_key)
            .unwrap();

        let dir = TempDir::new().unwrap();
        let ca_file = write(dir.path(), "ca.pem", &ca_cert.pem());
        let server = TlsSettings {
            certificate_file: write(dir.path(), "server.pem", &server_cert.pem()),
            key_file: write(dir.path(), "server.key", &server_key.serialize_pem()),
            ca_file: Some(ca_file.clone()),
            trust: TrustPool::Fixed,
        };
        let client = TlsSettings {
            certificate_file: write(dir.path(), "client.pem", &client_cert.pem()),
            key_file: write(dir.path(), "client.key", &client_key.serialize_pem()),
            ca_file: Some(ca_file),
            trust: TrustPool::Fixed,
        };

        Self { dir, server, client }
    }

    /// A second, unrelated client identity the server's pool does not trust
    pub fn untrusted_client(&self) -> TlsSettings {
        let rogue_ca_key = KeyPair::generate().unwrap();
        let mut rogue_ca_params = CertificateParams::new(Vec::new()).unwrap();
        rogue_ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let rogue_ca = rogue_ca_params.self_signed(&rogue_ca_key).unwrap();

        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["rogue.test".to_string()]).unwrap();
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let cert = params.signed_by(&key, &rogue_ca, &rogue_ca_key).unwrap();

        TlsSettings {
            certificate_file: write(self.dir.path(), "rogue.pem", &cert.pem()),
            key_file: write(self.dir.path(), "rogue.key", &key.serialize_pem()),
            ca_file: self.client.ca_file.clone(),
            trust: TrustPool::Fixed,
        }
    }
}

fn write(dir: &Path, name: &str, pem: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, pem).unwrap();
    path
}
