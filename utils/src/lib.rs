use std::path::{Path, PathBuf};
use std::fs::File;
use std::io::{Write, Read};
use glob::glob;
use log::warn;
use walkdir::WalkDir;

pub mod fft;
pub mod focus;

pub fn read_to_string(filepath:&Path,extension:&str) -> std::io::Result<String> {
    let p = filepath.with_extension(extension);
    let mut f = File::open(&p)?;
    let mut s = String::new();
    f.read_to_string(&mut s)?;
    Ok(s)
}

pub fn write_to_file(filepath:&Path,extension:&str,string:&str) -> std::io::Result<()> {
    let p = filepath.with_extension(extension);
    let mut f = File::create(p)?;
    f.write_all(string.as_bytes())
}

fn glob_matches(dir:&Path,pattern:&str) -> Vec<PathBuf> {
    let pat = dir.join(pattern);
    let pat = match pat.to_str() {
        Some(pat) => pat.to_string(),
        None => {
            warn!("cannot coerce {:?} to a glob pattern",pat);
            return vec![]
        }
    };
    match glob(&pat) {
        Ok(paths) => {
            let mut matches:Vec<PathBuf> = paths.flat_map(|m| m).collect();
            matches.sort();
            matches
        }
        Err(e) => {
            warn!("failed to read glob pattern {}: {}",pat,e);
            vec![]
        }
    }
}

// single depth search
pub fn get_all_matches(dir:&Path,pattern:&str) -> Option<Vec<PathBuf>> {
    let matches = glob_matches(dir,pattern);
    match matches.is_empty() {
        true => None,
        false => Some(matches)
    }
}

// recursive walk
pub fn find_files(base_dir:&Path,extension:&str) -> Option<Vec<PathBuf>>  {
    let mut files = Vec::<PathBuf>::new();
    for entry in WalkDir::new(base_dir).into_iter().filter_map(|e| e.ok()) {
        match entry.path().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext == extension => files.push(entry.path().to_owned()),
            _=> {}
        }
    }
    files.sort();
    match files.len(){
        0 => None,
        _=> Some(files)
    }
}
