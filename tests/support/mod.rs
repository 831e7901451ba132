//! Test support utilities for catapult integration tests.
//!
//! Provides isolated catapult roots, fakes for every external collaborator,
//! and helper commands.

#![allow(dead_code)]

pub mod fakes;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::Path;

use catapult::core::cipher::{Age, Cipher, Passphrase};
use std::time::Duration;

use catapult::core::domain::Configuration;
use catapult::core::engine::{self, Context, RunOptions, RunReport};
use catapult::core::layout::Layout;
use catapult::core::lock::LockOptions;
use catapult::core::settings::Settings;
use catapult::error::Result;
use tempfile::TempDir;

/// A cheap work factor so tests stay fast.
pub fn cipher() -> Age {
    Age::with_work_factor(10)
}

/// Isolated catapult root and home directory.
///
/// Child commands use `.current_dir()` and an explicit `--root`, so tests
/// can run in parallel.
pub struct Test {
    pub dir: TempDir,
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// A root with settings and every secret blob encrypted.
    pub fn seeded(configuration: &str) -> Self {
        let t = Self::new();
        t.write_settings(false);
        t.write_keypair();
        t.encrypt_keypair();
        t.encrypt_configuration(configuration);
        t
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.root())
    }

    pub fn passphrase(&self) -> Passphrase {
        Passphrase::new(PASSPHRASE)
    }

    pub fn write_settings(&self, edit: bool) {
        let layout = self.layout();
        std::fs::create_dir_all(layout.secrets_dir()).unwrap();
        std::fs::write(
            layout.settings(),
            format!(
                "[settings]\npassphrase = \"{}\"\nedit = {}\nprovider_timeout_secs = 5\n",
                PASSPHRASE, edit
            ),
        )
        .unwrap();
    }

    pub fn settings(&self) -> Settings {
        Settings::load_with(&self.layout().settings(), None).expect("invalid test settings")
    }

    pub fn write_keypair(&self) {
        let [private, public] = self.layout().keypair();
        std::fs::create_dir_all(self.layout().secrets_dir()).unwrap();
        std::fs::write(private.plaintext, PRIVATE_KEY).unwrap();
        std::fs::write(public.plaintext, PUBLIC_KEY).unwrap();
    }

    pub fn encrypt_keypair(&self) {
        for blob in self.layout().keypair() {
            let plaintext = std::fs::read(&blob.plaintext).unwrap();
            let armored = cipher().encrypt(&plaintext, &self.passphrase()).unwrap();
            std::fs::write(blob.ciphertext, armored).unwrap();
        }
    }

    pub fn encrypt_configuration(&self, configuration: &str) {
        let armored = cipher()
            .encrypt(configuration.as_bytes(), &self.passphrase())
            .unwrap();
        std::fs::write(self.layout().configuration().ciphertext, armored).unwrap();
    }

    /// Decrypt the committed configuration.
    pub fn committed(&self) -> Configuration {
        let armored = std::fs::read_to_string(self.layout().configuration().ciphertext).unwrap();
        let plaintext = cipher().decrypt(&armored, &self.passphrase()).unwrap();
        Configuration::from_bytes(&plaintext).unwrap()
    }

    pub fn ciphertext(&self) -> Vec<u8> {
        std::fs::read(self.layout().configuration().ciphertext).unwrap()
    }

    /// Write a same-day database backup for a website.
    pub fn write_backup(&self, service: &str, domain: &str) {
        let backup = self.layout().backup(service, domain, today());
        std::fs::create_dir_all(backup.parent().unwrap()).unwrap();
        std::fs::write(backup, "-- dump").unwrap();
    }

    /// One engine run against fakes.
    pub fn run(&self, vcs: &FakeVcs, connector: &FakeConnector) -> Result<RunReport> {
        let layout = self.layout();
        let settings = self.settings();
        let cipher = cipher();
        let ctx = Context {
            layout: &layout,
            settings: &settings,
            vcs,
            cipher: &cipher,
            connector,
            today: today(),
            options: RunOptions {
                sync: true,
                lock: LockOptions {
                    poll: Duration::from_millis(10),
                    timeout: Duration::from_millis(100),
                },
            },
        };
        engine::run(&ctx)
    }
}
