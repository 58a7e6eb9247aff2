use std::cell::Cell;

use globe_viewer::{
    error::ViewerError,
    resources::{TextureCache, TextureHandle, TextureRole},
};

#[test]
fn one_upload_serves_every_role_of_a_path() {
    let uploads = Cell::new(0);
    let mut cache: TextureCache<u32> = TextureCache::default();
    let upload = || -> globe_viewer::Result<u32> {
        uploads.set(uploads.get() + 1);
        Ok(uploads.get())
    };

    let diffuse = *cache.upload_with("textures/milky_way.jpg", upload).unwrap();
    cache.insert_handle("textures/milky_way.jpg", TextureRole::Diffuse, TextureHandle(1));
    let specular = *cache.upload_with("textures/milky_way.jpg", upload).unwrap();
    cache.insert_handle("textures/milky_way.jpg", TextureRole::Specular, TextureHandle(2));

    assert_eq!(diffuse, specular);
    assert_eq!(uploads.get(), 1);
    assert_eq!(cache.upload_count(), 1);
    assert_eq!(
        cache.handle("textures/milky_way.jpg", TextureRole::Diffuse),
        Some(TextureHandle(1))
    );
    assert_eq!(
        cache.handle("textures/milky_way.jpg", TextureRole::Specular),
        Some(TextureHandle(2))
    );

    cache.upload_with("textures/earth_clouds.png", upload).unwrap();
    assert_eq!(uploads.get(), 2);
    assert_eq!(cache.handle("textures/earth_clouds.png", TextureRole::Diffuse), None);
}

#[test]
fn failed_uploads_are_retried() {
    let mut cache: TextureCache<u32> = TextureCache::default();
    let err = cache
        .upload_with("textures/huge.jpg", || {
            Err(ViewerError::ResourceExhausted("too large".to_string()))
        })
        .unwrap_err();
    assert!(matches!(err, ViewerError::ResourceExhausted(_)));
    assert_eq!(cache.upload_count(), 0);

    assert_eq!(*cache.upload_with("textures/huge.jpg", || Ok(7)).unwrap(), 7);
    assert_eq!(cache.upload_count(), 1);
}
