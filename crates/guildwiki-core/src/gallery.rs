//! Wiki gallery enumeration.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::wiki::WikiKind;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    /// Public URL under `/static/img/wiki/`.
    pub url: String,
    pub original: String,
}

fn is_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn is_plain_segment(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}

/// List the gallery images of one wiki entity.
///
/// Reads `<static_root>/img/wiki/<folder>/<id>/`. File names differing only
/// by case count once (the byte-wise smallest name is kept) and the result
/// is sorted by lower-cased name. A missing directory or an empty or
/// path-like `id` yields an empty list.
///
/// # Errors
///
/// Returns the I/O error when the directory exists but cannot be read.
pub fn list_gallery(static_root: &Path, kind: WikiKind, id: &str) -> io::Result<Vec<GalleryImage>> {
    if !is_plain_segment(id) {
        return Ok(Vec::new());
    }

    let folder = kind.gallery_folder();
    let dir = static_root.join("img").join("wiki").join(folder).join(id);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        // Non-UTF-8 names cannot be expressed as URLs here.
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_image(&name) {
            names.push(name);
        }
    }
    names.sort();

    let mut seen = HashSet::new();
    let mut images: Vec<GalleryImage> = names
        .into_iter()
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(|name| GalleryImage {
            url: format!("/static/img/wiki/{folder}/{id}/{name}"),
            original: name,
        })
        .collect();
    images.sort_by_cached_key(|img| img.original.to_lowercase());
    Ok(images)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn gallery_dir(root: &Path, folder: &str, id: &str) -> std::path::PathBuf {
        let dir = root.join("img").join("wiki").join(folder).join(id);
        fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn case_variants_collapse_to_one_entry() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = gallery_dir(tmp.path(), "organization", "7");
        fs::write(dir.join("A.JPG"), b"x").expect("write");
        fs::write(dir.join("a.jpg"), b"x").expect("write");

        let images = list_gallery(tmp.path(), WikiKind::Organization, "7").expect("list");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].original, "A.JPG");
        assert_eq!(images[0].url, "/static/img/wiki/organization/7/A.JPG");
    }

    #[test]
    fn filters_extensions_and_sorts_case_insensitively() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = gallery_dir(tmp.path(), "personalities", "p1");
        for name in ["b.png", "C.webp", "a.GIF", "notes.txt", "d.jpeg"] {
            fs::write(dir.join(name), b"x").expect("write");
        }
        fs::create_dir(dir.join("nested.jpg")).expect("mkdir");

        let images = list_gallery(tmp.path(), WikiKind::Person, "p1").expect("list");
        let names: Vec<&str> = images.iter().map(|i| i.original.as_str()).collect();
        assert_eq!(names, vec!["a.GIF", "b.png", "C.webp", "d.jpeg"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let images = list_gallery(tmp.path(), WikiKind::Event, "none").expect("list");
        assert!(images.is_empty());
    }

    #[test]
    fn empty_or_path_like_id_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        gallery_dir(tmp.path(), "organization", "x");
        assert!(list_gallery(tmp.path(), WikiKind::Organization, "").expect("list").is_empty());
        assert!(list_gallery(tmp.path(), WikiKind::Organization, "..").expect("list").is_empty());
        assert!(list_gallery(tmp.path(), WikiKind::Organization, "../organization")
            .expect("list")
            .is_empty());
    }
}
