//! Client identity configuration

use std::io::Read;

use sslkit_client::tls::IdentityMaterial;

use super::core::SessionBuilder;

impl<S> SessionBuilder<S> {
    /// Present the key and chain of a PKCS#12 archive for client authentication
    pub fn identity_pkcs12<R: Read>(mut self, reader: R, passphrase: &str) -> Self {
        let identity = IdentityMaterial::from_pkcs12(reader, passphrase);
        if let Some(identity) = self.record(identity) {
            self.identity = Some(identity);
        }
        self
    }

    /// Present already loaded identity material
    pub fn identity(mut self, identity: IdentityMaterial) -> Self {
        self.identity = Some(identity);
        self
    }
}
