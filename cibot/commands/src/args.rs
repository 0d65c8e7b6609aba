// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

//! CI jobs invoke the binaries with single-dash uppercase flags such as
//! `-BRANCH_NAME main`. Those are rewritten to the `--BRANCH_NAME` spelling
//! clap understands before parsing.

use std::ffi::OsString;

/// Rewrite `-NAME` and `-NAME=value` arguments to `--NAME` and
/// `--NAME=value`. The program name and everything else pass through.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(index, arg)| {
            if index == 0 {
                return arg;
            }
            let rewritten = arg.to_str().and_then(long_spelling);
            match rewritten {
                Some(rewritten) => OsString::from(rewritten),
                None => arg,
            }
        })
        .collect()
}

fn long_spelling(arg: &str) -> Option<String> {
    let rest = arg.strip_prefix('-')?;
    let name = rest.split('=').next()?;
    if is_uppercase_name(name) {
        Some(format!("-{}", arg))
    } else {
        None
    }
}

// Single letters stay short flags (`-V`, `-h`).
fn is_uppercase_name(name: &str) -> bool {
    name.len() > 1
        && name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(args: &[&str]) -> Vec<String> {
        normalize_args(args.iter().copied())
            .into_iter()
            .map(|arg| arg.into_string().expect("utf-8"))
            .collect()
    }

    #[test]
    fn single_dash_names_become_long_flags() {
        assert_eq!(
            normalized(&[
                "checkout-branch",
                "-BRANCH_NAME",
                "main",
                "-CI_WORK_PATH=/ci",
                "-PR_NUMBER",
                "7",
            ]),
            vec![
                "checkout-branch",
                "--BRANCH_NAME",
                "main",
                "--CI_WORK_PATH=/ci",
                "--PR_NUMBER",
                "7",
            ]
        );
    }

    #[test]
    fn other_arguments_pass_through() {
        let args = [
            "-PROGRAM",
            "--BRANCH_NAME",
            "--log-dir",
            "-V",
            "-h",
            "-lowercase",
            "-Mixed_Case",
            "-",
            "release-1.0",
        ];
        assert_eq!(normalized(&args), args.to_vec());
    }
}
