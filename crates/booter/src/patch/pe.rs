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

//! Just enough PE/COFF parsing to check that an EFI binary is still a
//! well-formed image after its embedded script was replaced.

use std::ops::Range;

use super::PatchError;

const DOS_SIGNATURE: &[u8; 2] = b"MZ";
const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
const DOS_HEADER_SIZE: usize = 0x40;
const E_LFANEW_OFFSET: usize = 0x3C;
const COFF_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;
const CHECKSUM_OFFSET_IN_OPTIONAL_HEADER: usize = 64;

const PE32_MAGIC: u16 = 0x10b;
const PE32_PLUS_MAGIC: u16 = 0x20b;

pub const MACHINE_AMD64: u16 = 0x8664;
pub const MACHINE_ARM64: u16 = 0xaa64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub raw_data: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeImage {
    pub machine: u16,
    pub checksum_offset: usize,
    pub sections: Vec<Section>,
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, PatchError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(PatchError::InvalidPe("truncated header"))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, PatchError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(PatchError::InvalidPe("truncated header"))
}

impl PeImage {
    pub fn parse(data: &[u8]) -> Result<Self, PatchError> {
        if data.len() < DOS_HEADER_SIZE || &data[..2] != DOS_SIGNATURE {
            return Err(PatchError::InvalidPe("missing MZ signature"));
        }

        let pe_offset = read_u32(data, E_LFANEW_OFFSET)? as usize;
        if data.get(pe_offset..pe_offset + 4) != Some(PE_SIGNATURE.as_slice()) {
            return Err(PatchError::InvalidPe("missing PE signature"));
        }

        let coff = pe_offset + 4;
        let machine = read_u16(data, coff)?;
        let number_of_sections = read_u16(data, coff + 2)? as usize;
        let size_of_optional_header = read_u16(data, coff + 16)? as usize;

        let optional_header = coff + COFF_HEADER_SIZE;
        match read_u16(data, optional_header)? {
            PE32_MAGIC | PE32_PLUS_MAGIC => {}
            _ => return Err(PatchError::InvalidPe("unknown optional header magic")),
        }
        if size_of_optional_header < CHECKSUM_OFFSET_IN_OPTIONAL_HEADER + 4 {
            return Err(PatchError::InvalidPe("optional header too small"));
        }

        let section_table = optional_header + size_of_optional_header;
        let mut sections = Vec::with_capacity(number_of_sections);
        for idx in 0..number_of_sections {
            let header = section_table + idx * SECTION_HEADER_SIZE;
            let name = data
                .get(header..header + 8)
                .ok_or(PatchError::InvalidPe("truncated section table"))?;
            let raw_size = read_u32(data, header + 16)? as usize;
            let raw_offset = read_u32(data, header + 20)? as usize;

            let raw_end = raw_offset
                .checked_add(raw_size)
                .filter(|end| *end <= data.len())
                .ok_or(PatchError::InvalidPe("section data outside of file"))?;

            sections.push(Section {
                name: String::from_utf8_lossy(name)
                    .trim_end_matches('\0')
                    .to_string(),
                raw_data: raw_offset..raw_end,
            });
        }

        Ok(PeImage {
            machine,
            checksum_offset: optional_header + CHECKSUM_OFFSET_IN_OPTIONAL_HEADER,
            sections,
        })
    }

    pub fn section_containing(&self, range: &Range<usize>) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.raw_data.start <= range.start && range.end <= s.raw_data.end)
    }

    pub fn stored_checksum(&self, data: &[u8]) -> Result<u32, PatchError> {
        read_u32(data, self.checksum_offset)
    }

    /// Recomputes the optional header checksum, but only if the image had
    /// one to begin with. EFI loaders don't check it, signing tools do.
    pub fn update_checksum(&self, data: &mut [u8]) -> Result<(), PatchError> {
        if self.stored_checksum(data)? == 0 {
            return Ok(());
        }
        let checksum = checksum(data, self.checksum_offset);
        data[self.checksum_offset..self.checksum_offset + 4]
            .copy_from_slice(&checksum.to_le_bytes());
        Ok(())
    }
}

/// The PE image checksum: a folded 16-bit one's complement style sum over
/// the file with the checksum field taken as zero, plus the file length.
pub fn checksum(data: &[u8], checksum_offset: usize) -> u32 {
    let mut sum: u64 = 0;
    for (idx, chunk) in data.chunks(2).enumerate() {
        let offset = idx * 2;
        if offset + 2 > checksum_offset && offset < checksum_offset + 4 {
            continue;
        }
        let word = u16::from_le_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]);
        sum += u64::from(word);
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum = (sum & 0xffff) + (sum >> 16);

    (sum as u32).wrapping_add(data.len() as u32)
}
