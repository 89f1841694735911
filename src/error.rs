use axum::{
    Json,
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snafu::{ErrorCompat, Snafu};
use std::{num::ParseIntError, path::PathBuf};

pub type BursarResult<T> = Result<T, BursarError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BursarError {
    #[snafu(display("Error opening database"))]
    OpenDatabase { source: sqlx::Error },
    #[snafu(display("Error getting db connection"))]
    GetDatabaseConnection { source: sqlx::Error },
    #[snafu(display("Error making SQL query"))]
    MakeQuery { source: sqlx::Error },
    #[snafu(display("Error commiting SQL transaction"))]
    CommitTransaction { source: sqlx::Error },
    #[snafu(display("Error migrating DB schema"))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Stored student {id} has an unreadable date of birth {original:?}"))]
    CorruptRecord {
        source: jiff::Error,
        id: i64,
        original: String,
    },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse env var `{}` from {:?}", name, original))]
    ParseSize {
        source: ParseIntError,
        name: &'static str,
        original: String,
    },
    #[snafu(display("Unable to create upload directory {}", path.display()))]
    CreateUploadDir {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Unable to write upload to {}", path.display()))]
    WriteUpload {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("Invalid input. Please provide all required fields (missing `{field}`)."))]
    MissingField { field: &'static str },
    #[snafu(display("Invalid input. `{field}` must not be empty."))]
    EmptyField { field: &'static str },
    #[snafu(display("Invalid date format {original:?}. Use YYYY-MM-DD."))]
    InvalidDateFormat {
        source: jiff::Error,
        original: String,
    },
    #[snafu(display("Student not found"))]
    NotFound { id: i64 },
    #[snafu(display("Student not found"))]
    UnknownStudentPath { source: PathRejection },
    #[snafu(display("No data provided for update"))]
    NoInput,
    #[snafu(display("Unable to read JSON body"))]
    MalformedBody { source: JsonRejection },
    #[snafu(display("No file part"))]
    NoFilePart,
    #[snafu(display("No selected file"))]
    NoFilename,
    #[snafu(display("Invalid file type: {file_name:?}"))]
    InvalidFileType { file_name: String },
    #[snafu(display("Error with multipart form input"))]
    Multipart { source: MultipartError },
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl BursarError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::EmptyField { .. } => "empty_field",
            Self::InvalidDateFormat { .. } => "invalid_date_format",
            Self::NotFound { .. } | Self::UnknownStudentPath { .. } => "not_found",
            Self::NoInput => "no_input",
            Self::MalformedBody { .. } => "malformed_body",
            Self::NoFilePart => "no_file_part",
            Self::NoFilename => "no_filename",
            Self::InvalidFileType { .. } => "invalid_file_type",
            Self::Multipart { .. } => "multipart",
            _ => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input

        match self {
            Self::MissingField { .. }
            | Self::EmptyField { .. }
            | Self::InvalidDateFormat { .. }
            | Self::NoInput
            | Self::MalformedBody { .. }
            | Self::NoFilePart
            | Self::NoFilename
            | Self::InvalidFileType { .. } => BI,
            Self::NotFound { .. } | Self::UnknownStudentPath { .. } => NF,
            Self::Multipart { source } => source.status(),
            Self::OpenDatabase { .. }
            | Self::GetDatabaseConnection { .. }
            | Self::MakeQuery { .. }
            | Self::CommitTransaction { .. }
            | Self::Migrate { .. }
            | Self::CorruptRecord { .. }
            | Self::BadEnvVar { .. }
            | Self::ParseSize { .. }
            | Self::CreateUploadDir { .. }
            | Self::WriteUpload { .. } => ISE,
        }
    }

    /// Client mistakes only get the top-level message, anything else gets the whole causal chain.
    pub fn message(&self) -> String {
        match self {
            Self::MissingField { .. }
            | Self::EmptyField { .. }
            | Self::InvalidDateFormat { .. }
            | Self::NotFound { .. }
            | Self::UnknownStudentPath { .. }
            | Self::NoInput
            | Self::NoFilePart
            | Self::NoFilename
            | Self::InvalidFileType { .. } => self.to_string(),
            _ => self
                .iter_chain()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(": "),
        }
    }
}

impl IntoResponse for BursarError {
    fn into_response(self) -> Response {
        let status_code = self.status();
        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            warn!(?self, "Rejected request");
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
        };
        (status_code, Json(body)).into_response()
    }
}
