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

use std::ops::Range;

use super::PatchError;

/// The template binaries are built with an embedded script that starts and
/// ends with these markers. Everything between them is free for our script.
pub const PLACEHOLDER_START: &[u8] = b"# *PLACEHOLDER START*";
pub const PLACEHOLDER_END: &[u8] = b"# *PLACEHOLDER END*";

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Byte range of the reserved region, end marker included.
pub fn locate(contents: &[u8]) -> Result<Range<usize>, PatchError> {
    let start = find(contents, PLACEHOLDER_START).ok_or(PatchError::PlaceholderStartNotFound)?;
    let end = find(contents, PLACEHOLDER_END).ok_or(PatchError::PlaceholderEndNotFound)?;

    if end < start + PLACEHOLDER_START.len() {
        return Err(PatchError::PlaceholderOutOfOrder);
    }

    let region = start..end + PLACEHOLDER_END.len();
    if find(&contents[region.end..], PLACEHOLDER_START).is_some()
        || find(&contents[region.end..], PLACEHOLDER_END).is_some()
    {
        return Err(PatchError::PlaceholderDuplicated);
    }

    Ok(region)
}

/// Overwrites the reserved region with `script`, padding with newlines so
/// the binary keeps its exact size.
pub fn patch_script(contents: &[u8], script: &[u8]) -> Result<Vec<u8>, PatchError> {
    if let Some(offset) = script.iter().position(|b| *b == 0) {
        return Err(PatchError::NulInScript(offset));
    }

    let region = locate(contents)?;
    let capacity = region.len();
    if script.len() > capacity {
        return Err(PatchError::ScriptTooLarge {
            script: script.len(),
            capacity,
        });
    }

    let mut patched = contents.to_vec();
    let (script_area, padding) = patched[region].split_at_mut(script.len());
    script_area.copy_from_slice(script);
    padding.fill(b'\n');

    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(filler: usize) -> Vec<u8> {
        let mut contents = b"\x7fHEADER\0\0".to_vec();
        contents.extend_from_slice(PLACEHOLDER_START);
        contents.extend(std::iter::repeat_n(b'#', filler));
        contents.extend_from_slice(PLACEHOLDER_END);
        contents.extend_from_slice(b"\0TRAILER");
        contents
    }

    #[test]
    fn test_patch_script_fills_region() {
        let contents = template(64);
        let script = b"#!ipxe\nchain http://10.0.0.1/boot.ipxe\n";

        let patched = patch_script(&contents, script).unwrap();

        assert_eq!(patched.len(), contents.len());
        assert!(patched.starts_with(b"\x7fHEADER\0\0#!ipxe\nchain"));
        assert!(patched.ends_with(b"\n\0TRAILER"));

        let region = 9..9 + PLACEHOLDER_START.len() + 64 + PLACEHOLDER_END.len();
        assert_eq!(&patched[region.start..region.start + script.len()], script);
        assert!(
            patched[region.start + script.len()..region.end]
                .iter()
                .all(|b| *b == b'\n')
        );
    }

    #[test]
    fn test_script_may_use_the_whole_region() {
        let contents = template(8);
        let capacity = PLACEHOLDER_START.len() + 8 + PLACEHOLDER_END.len();

        assert!(patch_script(&contents, &vec![b'x'; capacity]).is_ok());
        assert!(matches!(
            patch_script(&contents, &vec![b'x'; capacity + 1]),
            Err(PatchError::ScriptTooLarge { script, capacity: c }) if script == capacity + 1 && c == capacity
        ));
    }

    #[test]
    fn test_missing_markers() {
        assert!(matches!(
            patch_script(b"no markers here", b"#!ipxe"),
            Err(PatchError::PlaceholderStartNotFound)
        ));

        let mut only_start = b"xx".to_vec();
        only_start.extend_from_slice(PLACEHOLDER_START);
        assert!(matches!(
            patch_script(&only_start, b"#!ipxe"),
            Err(PatchError::PlaceholderEndNotFound)
        ));
    }

    #[test]
    fn test_markers_out_of_order() {
        let mut contents = PLACEHOLDER_END.to_vec();
        contents.extend_from_slice(PLACEHOLDER_START);
        assert!(matches!(locate(&contents), Err(PatchError::PlaceholderOutOfOrder)));
    }

    #[test]
    fn test_duplicated_placeholder() {
        let mut contents = template(4);
        contents.extend(template(4));
        assert!(matches!(locate(&contents), Err(PatchError::PlaceholderDuplicated)));
    }

    #[test]
    fn test_nul_in_script() {
        assert!(matches!(
            patch_script(&template(64), b"#!ipxe\n\0echo"),
            Err(PatchError::NulInScript(7))
        ));
    }
}
