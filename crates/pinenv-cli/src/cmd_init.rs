// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pinenv init` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

#[cfg(test)]
#[path = "./cmd_init_test.rs"]
mod cmd_init_test;

/// Create a new .pinenv.yaml file
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Directory to create file in
    #[clap(default_value = ".")]
    path: PathBuf,

    /// Enable in-tree inheritance
    #[clap(long)]
    inherit: bool,

    /// Add an initial package request
    #[clap(short = 'p', long = "package")]
    packages: Vec<String>,

    /// Snapshot pin to resolve packages against
    #[clap(long)]
    pin: Option<pinenv::SnapshotPin>,

    /// Template to use: minimal, standard, full
    #[clap(long, default_value = "standard")]
    template: String,
}

impl CmdInit {
    pub async fn run(&mut self) -> Result<i32> {
        let spec_path = self.path.join(pinenv::PINENV_FILENAME);

        if spec_path.exists() {
            return Err(miette::miette!(
                ".pinenv.yaml already exists at {:?}",
                spec_path
            ));
        }

        let content = self.render();

        std::fs::write(&spec_path, content)
            .map_err(|e| miette::miette!("Failed to write .pinenv.yaml: {}", e))?;

        println!("Created .pinenv.yaml at {:?}", spec_path);
        println!();
        println!("Next steps:");
        println!("  1. Edit the file to add your packages and pin");
        println!("  2. Run 'pinenv show --resolve' to preview the environment");
        println!("  3. Run 'pinenv load' to enter the environment");

        Ok(0)
    }

    fn render(&self) -> String {
        match self.template.as_str() {
            "minimal" => self.generate_minimal_template(),
            "full" => self.generate_full_template(),
            _ => self.generate_standard_template(),
        }
    }

    fn pin_line(&self) -> String {
        match &self.pin {
            Some(pin) => format!("pin: \"{pin}\"\n"),
            None => "# pin: 0123456789abcdef0123456789abcdef01234567\n".to_string(),
        }
    }

    fn packages_section(&self) -> String {
        if self.packages.is_empty() {
            "# packages:\n\
            #   - cowsay\n\
            #   - python3Packages.xmljson\n"
                .to_string()
        } else {
            format!(
                "packages:\n{}\n",
                self.packages
                    .iter()
                    .map(|p| format!("  - \"{p}\""))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        }
    }

    fn generate_minimal_template(&self) -> String {
        let packages = if self.packages.is_empty() {
            "packages: []\n".to_string()
        } else {
            self.packages_section()
        };
        format!(
            "api: pinenv/v0\n\
            inherit: {}\n\
            {}\
            \n\
            {}",
            self.inherit,
            self.pin_line(),
            packages
        )
    }

    fn generate_standard_template(&self) -> String {
        format!(
            "# pinenv environment specification\n\
            \n\
            api: pinenv/v0\n\
            \n\
            # Optional: Human-readable description\n\
            # description: \"My project environment\"\n\
            \n\
            # In-tree inheritance (default: false for security)\n\
            # When true, walks up directory tree loading parent .pinenv.yaml files\n\
            inherit: {}\n\
            \n\
            # Snapshot of the package universe, a revision or URL#sha256=HASH\n\
            {}\
            \n\
            # Packages by attribute path, optionally with a version: python3@3.11\n\
            {}\
            \n\
            # Environment variables\n\
            # variables:\n\
            #   EDITOR: vim\n",
            self.inherit,
            self.pin_line(),
            self.packages_section(),
        )
    }

    fn generate_full_template(&self) -> String {
        format!(
            "# pinenv environment specification\n\
            # Full example with all fields documented\n\
            \n\
            api: pinenv/v0\n\
            \n\
            description: \"Full example environment\"\n\
            \n\
            inherit: {}\n\
            \n\
            # Composed before this file, relative to it\n\
            includes: []\n\
            #   - ~/.config/pinenv/defaults.pinenv.yaml\n\
            #   - ../shared/common.pinenv.yaml\n\
            \n\
            # Attribute paths may be written relative to this root\n\
            root: pkgs\n\
            \n\
            {}\
            \n\
            {}\
            \n\
            variables: {{}}\n\
            #   PROJECT_ROOT: /work/project\n\
            \n\
            # Start from an empty environment, keeping HOME, TERM and these\n\
            pure: false\n\
            keep: []\n\
            #   - SSH_AUTH_SOCK\n\
            \n\
            # Run once when the environment is entered\n\
            # hook: |\n\
            #   echo \"environment ready\"\n",
            self.inherit,
            self.pin_line(),
            self.packages_section(),
        )
    }
}
