//! File-level operations for a device.
//!
//! | Function | Method | Endpoint |
//! |----------|--------|----------|
//! | [`create_file`] | POST | `/createFile` |
//! | [`delete_file`] | DELETE | `/deleteFile` |
//! | [`copy_device`] | POST | `/copyDevice` |
//! | [`list_files`] | GET | `/listFile` |

use reqwest::Method;
use serde::Deserialize;

use crate::client::XmlClient;
use crate::envelope::Envelope;
use crate::error::{Result, XmlApiError};

const CREATE_FILE_ENDPOINT: &str = "/createFile";
const DELETE_FILE_ENDPOINT: &str = "/deleteFile";
const COPY_DEVICE_ENDPOINT: &str = "/copyDevice";
const LIST_FILES_ENDPOINT: &str = "/listFile";

/// `/listFile` body: a bare array of names, or `{"files": [...]}` with an
/// optional `error`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileListing {
    Bare(Vec<String>),
    Wrapped(WrappedListing),
}

#[derive(Debug, Deserialize)]
struct WrappedListing {
    #[serde(default)]
    files: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

impl FileListing {
    fn into_result(self) -> Result<Vec<String>> {
        match self {
            FileListing::Bare(files) => Ok(files),
            FileListing::Wrapped(WrappedListing {
                error: Some(error), ..
            }) if !error.is_empty() => Err(XmlApiError::Domain(error)),
            FileListing::Wrapped(listing) => Ok(listing.files.unwrap_or_default()),
        }
    }
}

/// Creates an empty XML file whose document element is `root_name`.
pub async fn create_file(
    client: &XmlClient,
    device_id: &str,
    filename: &str,
    root_name: &str,
) -> Result<String> {
    let params = [
        ("deviceid", device_id),
        ("filename", filename),
        ("rootname", root_name),
    ];
    let envelope: Envelope = client
        .execute_json(Method::POST, CREATE_FILE_ENDPOINT, &params)
        .await?;
    envelope.into_result()
}

/// Deletes an XML file from a device.
pub async fn delete_file(client: &XmlClient, device_id: &str, filename: &str) -> Result<String> {
    let params = [("deviceid", device_id), ("filename", filename)];
    let envelope: Envelope = client
        .execute_json(Method::DELETE, DELETE_FILE_ENDPOINT, &params)
        .await?;
    envelope.into_result()
}

/// Copies files from `device_id` to `new_device_id`.
///
/// With `filename` set only that file is copied; with `None` every file of
/// the device is (the service receives an empty `filename`). `overwrite`
/// controls whether existing files on the target are replaced and is sent as
/// the literal `true` / `false`.
///
/// # Errors
///
/// - `XmlApiError::Domain` — the service refused the copy (e.g. the target
///   file exists and `overwrite` is false).
/// - `XmlApiError::Api` / `Auth` / `Network` — see [`XmlClient::execute`].
pub async fn copy_device(
    client: &XmlClient,
    device_id: &str,
    new_device_id: &str,
    filename: Option<&str>,
    overwrite: bool,
) -> Result<String> {
    let overwrite = overwrite.to_string();
    let params = [
        ("deviceid", device_id),
        ("new_deviceid", new_device_id),
        ("filename", filename.unwrap_or_default()),
        ("overwrite", overwrite.as_str()),
    ];
    let envelope: Envelope = client
        .execute_json(Method::POST, COPY_DEVICE_ENDPOINT, &params)
        .await?;
    envelope.into_result()
}

/// Lists the XML files stored for a device, in the order the service sends
/// them.
pub async fn list_files(client: &XmlClient, device_id: &str) -> Result<Vec<String>> {
    let params = [("deviceid", device_id)];
    let listing: FileListing = client
        .execute_json(Method::GET, LIST_FILES_ENDPOINT, &params)
        .await?;
    listing.into_result()
}
