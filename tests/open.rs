//! Opening the on-disk backend from the config.
//!
//! This lives in its own test binary since it changes the global config.

mod common;

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use pinboard::{config::Config, gateway::Gateway};
    use temp_dir::TempDir;

    use crate::common::{draft, png_upload};

    #[tokio::test]
    async fn pins_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let data_dir = Utf8PathBuf::try_from(dir.path().to_path_buf())
            .unwrap()
            .join("nested");
        Config::write().await.data_dir = data_dir.clone();

        let pin = {
            let gateway = Gateway::open().await.expect("open on-disk stores");
            gateway
                .create(draft("persisted", &["disk"]), &png_upload())
                .await
                .unwrap()
        };
        assert!(pin.image_url.contains(data_dir.join("blobs").file_name().unwrap()));

        let reopened = Gateway::open().await.expect("reopen");
        let pins = reopened.fetch_all().await.unwrap();
        assert_eq!(pins, vec![pin]);
        assert!(data_dir.join("pinboard.sqlite").exists());
    }
}
