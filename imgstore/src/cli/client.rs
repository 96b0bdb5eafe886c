use std::process;

use client::ClientError;

fn exit_on_error<T>(result: Result<T, ClientError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

pub async fn upload(uri: &str, file: &str) {
    let reply = exit_on_error(client::upload_file(uri, file).await);
    println!("{}", reply.url);
}

pub async fn list(uri: &str) {
    let reply = exit_on_error(client::list_images(uri).await);
    client::print_images(&reply);
}

pub async fn delete(uri: &str, image_url: &str) {
    let reply = exit_on_error(client::delete_image(uri, image_url).await);
    println!("{}", reply.message);
}
