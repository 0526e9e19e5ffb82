use std::fs;
use std::path::Path;

use log::debug;

use crate::error::LoadError;
use crate::memory::MEM_SIZE;

/// Parses an `.ls8` listing: one 8-digit binary literal per line, `#` starts a
/// comment, blank lines are skipped.
///
/// Operand counts are not checked here; a truncated instruction reads whatever
/// memory holds past the image.
pub fn parse(text: &str) -> Result<Vec<u8>, LoadError> {
    let mut image = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let literal = line.split('#').next().unwrap_or_default().trim();
        if literal.is_empty() {
            continue;
        }
        let byte = match u8::from_str_radix(literal, 2) {
            Ok(byte) if literal.len() == 8 && !literal.starts_with('+') => byte,
            _ => {
                return Err(LoadError::InvalidLiteral {
                    line: i + 1,
                    text: literal.to_string(),
                })
            }
        };
        image.push(byte);
    }
    if image.len() > MEM_SIZE {
        return Err(LoadError::TooLarge { len: image.len() });
    }
    Ok(image)
}

pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = parse(&text)?;
    debug!("loaded {} bytes from {}", image.len(), path.display());
    Ok(image)
}
