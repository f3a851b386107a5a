/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

//! Embeds the init script into prebuilt iPXE binaries, so firmware that
//! loads them over TFTP runs our script without fetching anything first.
//!
//! Runs once at startup. Every template is patched in memory before anything
//! is written, so either all architectures get fresh binaries or none do.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::extractors::machine_architecture::MachineArchitecture;

pub mod pe;
pub mod placeholder;

pub const ARCHITECTURES: [MachineArchitecture; 2] =
    [MachineArchitecture::Amd64, MachineArchitecture::Arm64];

/// `ipxe.efi` carries its own NIC drivers, `snp.efi` uses the firmware's.
pub const TEMPLATE_NAMES: [&str; 2] = ["ipxe.efi", "snp.efi"];

#[derive(thiserror::Error, Debug)]
pub enum PatchError {
    #[error("could not read iPXE template {path}: {error}")]
    ReadTemplate { path: PathBuf, error: io::Error },
    #[error("could not write patched iPXE binary {path}: {error}")]
    WriteBinary { path: PathBuf, error: io::Error },
    #[error("placeholder start not found")]
    PlaceholderStartNotFound,
    #[error("placeholder end not found")]
    PlaceholderEndNotFound,
    #[error("placeholder end precedes placeholder start")]
    PlaceholderOutOfOrder,
    #[error("placeholder found more than once")]
    PlaceholderDuplicated,
    #[error("script size {script} is larger than placeholder space {capacity}")]
    ScriptTooLarge { script: usize, capacity: usize },
    #[error("script contains a NUL byte at offset {0}")]
    NulInScript(usize),
    #[error("invalid PE image: {0}")]
    InvalidPe(&'static str),
    #[error("template is built for machine type {found:#06x}, expected {expected:#06x}")]
    MachineMismatch { expected: u16, found: u16 },
    #[error("placeholder is not inside a section")]
    PlaceholderOutsideSection,
    #[error("failed to patch {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: Box<PatchError>,
    },
}

fn expected_machine(arch: MachineArchitecture) -> u16 {
    match arch {
        MachineArchitecture::Amd64 => pe::MACHINE_AMD64,
        MachineArchitecture::Arm64 => pe::MACHINE_ARM64,
    }
}

/// Patches one EFI template: `(template bytes, script) -> patched bytes`.
///
/// The result has the same size as the template and still parses as a PE
/// image of the expected machine type.
pub fn patch_efi(
    template: &[u8],
    script: &[u8],
    arch: MachineArchitecture,
) -> Result<Vec<u8>, PatchError> {
    let image = pe::PeImage::parse(template)?;
    if image.machine != expected_machine(arch) {
        return Err(PatchError::MachineMismatch {
            expected: expected_machine(arch),
            found: image.machine,
        });
    }

    let region = placeholder::locate(template)?;
    if image.section_containing(&region).is_none() {
        return Err(PatchError::PlaceholderOutsideSection);
    }

    let mut patched = placeholder::patch_script(template, script)?;
    image.update_checksum(&mut patched)?;

    if pe::PeImage::parse(&patched)? != image {
        return Err(PatchError::InvalidPe("headers changed while patching"));
    }

    Ok(patched)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedBinary {
    pub arch: MachineArchitecture,
    pub name: &'static str,
    pub contents: Vec<u8>,
}

impl PatchedBinary {
    pub fn relative_path(&self) -> PathBuf {
        Path::new(self.arch.as_str()).join(self.name)
    }
}

/// Reads and patches every `<templates_dir>/<arch>/<name>` template.
pub fn patch_templates(
    script: &[u8],
    templates_dir: &Path,
) -> Result<Vec<PatchedBinary>, PatchError> {
    let mut patched = Vec::with_capacity(ARCHITECTURES.len() * TEMPLATE_NAMES.len());

    for arch in ARCHITECTURES {
        for name in TEMPLATE_NAMES {
            let path = templates_dir.join(arch.as_str()).join(name);
            let template = fs::read(&path).map_err(|error| PatchError::ReadTemplate {
                path: path.clone(),
                error,
            })?;

            let contents = patch_efi(&template, script, arch).map_err(|err| {
                PatchError::Template {
                    path: path.clone(),
                    source: Box::new(err),
                }
            })?;

            tracing::debug!(path = %path.display(), size = contents.len(), "patched iPXE template");

            patched.push(PatchedBinary {
                arch,
                name,
                contents,
            });
        }
    }

    Ok(patched)
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PatchError> {
    let write_err = |error| PatchError::WriteBinary {
        path: path.to_path_buf(),
        error,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    fs::write(&tmp_path, contents).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)
}

/// Patches all templates and writes them to `<output_dir>/<arch>/<name>`.
///
/// Returns the written paths. Nothing is written if any template fails.
pub fn patch_binaries(
    script: &[u8],
    templates_dir: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, PatchError> {
    let patched = patch_templates(script, templates_dir)?;

    let mut written = Vec::with_capacity(patched.len());
    for binary in patched {
        let path = output_dir.join(binary.relative_path());
        write_atomically(&path, &binary.contents)?;

        tracing::info!(path = %path.display(), arch = %binary.arch, "wrote patched iPXE binary");
        written.push(path);
    }

    Ok(written)
}
