use std::path::Path;

use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::{DeleteReply, DeleteRequest, ErrorReply, ImagesReply, UploadReply};
use reqwest::{Client, Response, StatusCode};
use resource::Resource;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

pub mod resource;

/// Multipart field the gateway reads the image from.
const IMAGE_FIELD: &str = "image";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid server URI '{0}'")]
    InvalidUri(String),

    #[error("invalid file path '{0}'")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server replied {status}: {error}")]
    Api { status: StatusCode, error: String },
}

fn endpoint(uri: &str, path: &str) -> Result<String, ClientError> {
    let mut resource = Resource::new(uri).ok_or_else(|| ClientError::InvalidUri(uri.to_owned()))?;
    resource.append_path(path);
    Ok(resource.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let error = match response.json::<ErrorReply>().await {
        Ok(reply) => reply.error,
        Err(e) => e.to_string(),
    };
    Err(ClientError::Api { status, error })
}

/// Uploads a local file, returning the URL it is served under.
pub async fn upload_file(uri: &str, file: &str) -> Result<UploadReply, ClientError> {
    let path = Path::new(file);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::InvalidPath(file.to_owned()))?
        .to_owned();

    let f = File::open(path).await?;
    let length = f.metadata().await?.len();
    let stream = reqwest::Body::wrap_stream(ReaderStream::new(f));
    let part = reqwest::multipart::Part::stream_with_length(stream, length).file_name(file_name);
    let form = reqwest::multipart::Form::new().part(IMAGE_FIELD, part);

    let response = Client::new()
        .post(endpoint(uri, "upload")?)
        .multipart(form)
        .send()
        .await?;
    decode(response).await
}

pub async fn list_images(uri: &str) -> Result<ImagesReply, ClientError> {
    let response = Client::new().get(endpoint(uri, "images")?).send().await?;
    decode(response).await
}

pub async fn delete_image(uri: &str, image_url: &str) -> Result<DeleteReply, ClientError> {
    let response = Client::new()
        .delete(endpoint(uri, "delete")?)
        .json(&DeleteRequest::new(image_url))
        .send()
        .await?;
    decode(response).await
}

pub fn print_images(reply: &ImagesReply) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Image").add_attribute(Attribute::Bold),
        ]);

    for (i, url) in reply.images.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(url)]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:3000", "upload", "http://localhost:3000/upload")]
    #[case("http://localhost:3000/", "images", "http://localhost:3000/images")]
    #[case("http://localhost:3000/gw", "delete", "http://localhost:3000/gw/delete")]
    #[trace]
    fn endpoint_tests(#[case] uri: &str, #[case] path: &str, #[case] expected: &str) {
        // Arrange

        // Act
        let result = endpoint(uri, path).unwrap();

        // Assert
        assert_eq!(result, expected);
    }

    #[test]
    fn endpoint_invalid_uri() {
        // Arrange

        // Act
        let result = endpoint("localhost", "upload");

        // Assert
        assert!(matches!(result, Err(ClientError::InvalidUri(_))));
    }
}
