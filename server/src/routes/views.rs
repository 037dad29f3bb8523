//! Server-rendered HTML pages over the same service the JSON API uses.

use live_gallery::{AssetView, GalleryError, GallerySummary};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use rocket::http::Status;
use rocket::{get, routes, Route, State};

use crate::error::ApiResult;
use crate::Gallery;

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #111; color: #eee; }
header { padding: 1rem 2rem; border-bottom: 1px solid #333; }
header a { color: #eee; text-decoration: none; font-weight: 600; }
main { padding: 2rem; }
.galleries { list-style: none; padding: 0; }
.galleries li { margin: 0.5rem 0; }
.galleries a { color: #8cf; }
.meta { color: #999; font-size: 0.85rem; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 1rem; }
.asset img, .asset video { width: 100%; border-radius: 4px; display: block; }
.asset video { margin-top: 0.25rem; }
form.password input { padding: 0.4rem; }
.error { color: #f77; }
"#;

pub fn routes() -> Vec<Route> {
    routes![index, gallery_page]
}

fn page(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                header { a href="/" { "Live Photos" } }
                main { (content) }
            }
        }
    }
}

fn render_index(galleries: &[GallerySummary]) -> Markup {
    let content = html! {
        h1 { "Galleries" }
        @if galleries.is_empty() {
            p { "Nothing has been uploaded yet." }
        } @else {
            ul.galleries {
                @for gallery in galleries {
                    li {
                        a href={ "/gallery/" (gallery.id) } { (gallery.name) }
                        " "
                        span.meta {
                            (gallery.photo_count) " photos, updated "
                            (gallery.last_updated.format("%Y-%m-%d %H:%M").to_string())
                            @if gallery.is_protected { " (password protected)" }
                        }
                    }
                }
            }
        }
    };
    page("Galleries", content)
}

fn render_gallery(gallery_id: &str, assets: &[AssetView]) -> Markup {
    let name = assets
        .first()
        .map(|a| a.gallery_name.as_str())
        .unwrap_or(gallery_id);

    let content = html! {
        h1 { (name) }
        @if assets.is_empty() {
            p { "This gallery is empty." }
        } @else {
            div.grid {
                @for asset in assets {
                    figure.asset id=(asset.id) {
                        img src=(asset.photo_url) alt=(asset.creation_date) loading="lazy";
                        video src=(asset.video_url) controls muted playsinline loop preload="none" {}
                        figcaption.meta {
                            (asset.creation_date)
                            @if let (Some(lat), Some(lon)) = (asset.latitude, asset.longitude) {
                                " · " (format!("{:.5}, {:.5}", lat, lon))
                            }
                        }
                    }
                }
            }
        }
    };
    page(name, content)
}

fn render_password_form(gallery_id: &str, error: Option<&str>) -> Markup {
    let content = html! {
        h1 { "Password required" }
        @if let Some(error) = error {
            p.error { (error) }
        }
        form.password method="get" action={ "/gallery/" (gallery_id) } {
            input type="password" name="p" placeholder="Gallery password" autofocus;
            " "
            button type="submit" { "View" }
        }
    };
    page("Password required", content)
}

#[get("/")]
async fn index(gallery: &State<Gallery>) -> ApiResult<Markup> {
    let galleries = gallery.list_galleries().await?;
    Ok(render_index(&galleries))
}

#[get("/gallery/<id>?<p>")]
async fn gallery_page(
    id: &str,
    p: Option<&str>,
    gallery: &State<Gallery>,
) -> ApiResult<(Status, Markup)> {
    match gallery.list_assets(Some(id), p).await {
        Ok(assets) => Ok((Status::Ok, render_gallery(id, &assets))),
        Err(GalleryError::AuthRequired) => {
            Ok((Status::Unauthorized, render_password_form(id, None)))
        }
        Err(GalleryError::Forbidden(message)) => {
            Ok((Status::Forbidden, render_password_form(id, Some(&message))))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn asset() -> AssetView {
        AssetView {
            id: "cafebabe".to_string(),
            photo_file: "cafebabe_photo.jpg".to_string(),
            video_file: "cafebabe_video.mov".to_string(),
            photo_size: 1,
            video_size: 2,
            creation_date: "2024-06-01".to_string(),
            upload_date: Utc::now(),
            latitude: Some(1.5),
            longitude: Some(-2.25),
            gallery_id: "beach".to_string(),
            gallery_name: "Beach <Day>".to_string(),
            has_delete_password: false,
            has_view_password: false,
            photo_url: "/files/beach/cafebabe_photo.jpg".to_string(),
            video_url: "/files/beach/cafebabe_video.mov".to_string(),
        }
    }

    #[test]
    fn gallery_page_links_media_and_escapes_names() {
        let html = render_gallery("beach", &[asset()]).into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"src="/files/beach/cafebabe_photo.jpg""#));
        assert!(html.contains(r#"src="/files/beach/cafebabe_video.mov""#));
        assert!(html.contains("Beach &lt;Day&gt;"));
        assert!(html.contains("1.50000, -2.25000"));
    }

    #[test]
    fn empty_gallery_falls_back_to_id() {
        let html = render_gallery("nothing-here", &[]).into_string();
        assert!(html.contains("<h1>nothing-here</h1>"));
        assert!(html.contains("This gallery is empty."));
    }

    #[test]
    fn password_form_submits_to_gallery() {
        let html = render_password_form("secret", Some("Incorrect password")).into_string();
        assert!(html.contains(r#"action="/gallery/secret""#));
        assert!(html.contains(r#"name="p""#));
        assert!(html.contains("Incorrect password"));
    }

    #[test]
    fn index_marks_protected_galleries() {
        let galleries = vec![GallerySummary {
            id: "family".to_string(),
            name: "Family".to_string(),
            photo_count: 3,
            last_updated: Utc::now(),
            is_protected: true,
        }];
        let html = render_index(&galleries).into_string();
        assert!(html.contains(r#"href="/gallery/family""#));
        assert!(html.contains("3 photos"));
        assert!(html.contains("(password protected)"));
    }
}
