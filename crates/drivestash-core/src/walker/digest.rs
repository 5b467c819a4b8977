/// SHA-512 content digests, shown next to selected files so a copy can be
/// checked against its source.
use crate::error::FsError;
use rayon::prelude::*;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const READ_CHUNK: usize = 64 * 1024;

/// Lowercase hex SHA-512 of the file at `path`, read in chunks.
///
/// # Errors
///
/// Open and read failures, classified via [`FsError::from_io`].
pub fn file_digest(path: &Path) -> Result<String, FsError> {
    let mut file = File::open(path).map_err(|e| FsError::from_io(path, e))?;
    let mut hasher = Sha512::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::from_io(path, e)),
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest many files concurrently. Results are in input order.
pub fn file_digests(paths: &[PathBuf]) -> Vec<Result<String, FsError>> {
    paths.par_iter().map(|p| file_digest(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ABC_SHA512: &str = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";

    #[test]
    fn known_vector() {
        let tmp = TempDir::new().unwrap();
        let f = tmp.path().join("abc.txt");
        fs::write(&f, b"abc").unwrap();
        assert_eq!(file_digest(&f).unwrap(), ABC_SHA512);
    }

    #[test]
    fn chunked_read_matches_one_shot() {
        let tmp = TempDir::new().unwrap();
        let f = tmp.path().join("big.bin");
        let data: Vec<u8> = (0..READ_CHUNK * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&f, &data).unwrap();
        let expected = format!("{:x}", Sha512::digest(&data));
        assert_eq!(file_digest(&f).unwrap(), expected);
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let results = file_digests(&[tmp.path().join("gone")]);
        assert!(matches!(results[0], Err(FsError::NotFound(_))));
    }
}
