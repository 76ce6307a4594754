//! Command-line surface: workflows and exit status conventions

pub mod orchestration;

pub use orchestration::{
    check_prerelease, derive_version, package, publish, release, release_notes, resolve_matrix,
    ConfiguredIndex, PackageArgs, PublishArgs, Session, SessionArgs,
};

use crate::error::{ReleaseError, Result};
use crate::ui;

/// Exit status of a successful command
pub const EXIT_OK: i32 = 0;

/// Exit status of a failed command, and of `is-prerelease` for a release
pub const EXIT_FAILURE: i32 = 1;

/// Exit status of `is-prerelease` when no version could be derived
pub const EXIT_UNDECIDED: i32 = 2;

/// Exit status for `is-prerelease`: 0 if true, 1 if false, 2 on error
pub fn prerelease_exit_code(answer: &Result<bool>) -> i32 {
    match answer {
        Ok(true) => EXIT_OK,
        Ok(false) => EXIT_FAILURE,
        Err(_) => EXIT_UNDECIDED,
    }
}

/// Print the error with its kind on stderr and return the exit status
pub fn report(error: &ReleaseError) -> i32 {
    ui::display_error(error);
    if let ReleaseError::UploadFailure { remaining, .. } = error {
        for path in remaining {
            eprintln!("  not uploaded: {}", path.display());
        }
        eprintln!("  rerun with --resume to continue");
    }
    EXIT_FAILURE
}
