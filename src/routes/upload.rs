use crate::{
    error::{
        BursarResult, InvalidFileTypeSnafu, MultipartSnafu, NoFilePartSnafu, NoFilenameSnafu,
        WriteUploadSnafu,
    },
    state::BursarState,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::Serialize;
use snafu::{ResultExt, ensure};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
const FILE_FIELD: &str = "file";

#[derive(Serialize)]
pub struct UploadedFile {
    message: &'static str,
    filename: String,
}

///case-insensitive check of whatever comes after the last `.`
pub fn allowed_file(file_name: &str) -> bool {
    file_name.rsplit_once('.').is_some_and(|(_, extension)| {
        ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    })
}

///Strips any directories off the client-supplied name, and swaps anything outside `[A-Za-z0-9._-]` for `_`.
pub fn sanitise_file_name(file_name: &str) -> String {
    let last_component = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    last_component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn storage_name(file_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitise_file_name(file_name))
}

pub async fn post_upload(
    State(state): State<BursarState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> BursarResult<Json<UploadedFile>> {
    //not being multipart at all means there can't be a file part
    let Ok(mut multipart) = multipart else {
        return NoFilePartSnafu.fail();
    };

    loop {
        let Some(field) = multipart.next_field().await.context(MultipartSnafu)? else {
            return NoFilePartSnafu.fail();
        };
        //a part without a filename attribute is a plain form value, not a file
        let Some(file_name) = field
            .file_name()
            .filter(|_| field.name() == Some(FILE_FIELD))
            .map(ToString::to_string)
        else {
            continue;
        };
        ensure!(!file_name.is_empty(), NoFilenameSnafu);
        ensure!(allowed_file(&file_name), InvalidFileTypeSnafu { file_name });

        let bytes = field.bytes().await.context(MultipartSnafu)?;

        let stored_name = storage_name(&file_name);
        let path = state
            .config()
            .upload_config()
            .directory()
            .join(&stored_name);
        tokio::fs::write(&path, &bytes)
            .await
            .context(WriteUploadSnafu { path: path.clone() })?;
        info!(?path, original = %file_name, size = bytes.len(), "Stored upload");

        return Ok(Json(UploadedFile {
            message: "File uploaded successfully",
            filename: stored_name,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_images_are_allowed() {
        for ok in ["photo.png", "PHOTO.JPG", "a.b.jpeg", "x.GiF"] {
            assert!(allowed_file(ok), "{ok}");
        }
        for bad in ["photo.exe", "png", "photo.", "photo.png.exe", ""] {
            assert!(!allowed_file(bad), "{bad}");
        }
    }

    #[test]
    fn sanitising_drops_directories_and_odd_characters() {
        assert_eq!(sanitise_file_name("../../etc/evil.png"), "evil.png");
        assert_eq!(sanitise_file_name("C:\\Users\\me\\cat.gif"), "cat.gif");
        assert_eq!(sanitise_file_name("my holiday (1).jpg"), "my_holiday__1_.jpg");
        assert_eq!(sanitise_file_name("plain-name_2.png"), "plain-name_2.png");
    }

    #[test]
    fn storage_names_do_not_collide() {
        let first = storage_name("photo.png");
        let second = storage_name("photo.png");
        assert_ne!(first, second);
        assert!(first.ends_with("-photo.png"));
    }
}
