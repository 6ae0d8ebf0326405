//! Server-rendered HTML pages

use std::fmt::Write as _;

use axum::response::Html;

use crate::gallery::DisplayItem;

const BASE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    nav a { margin-right: 1rem; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; max-width: 32rem; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; }
    .row { display: flex; gap: 1rem; margin-bottom: 1rem; }
    figure { margin: 0; width: 240px; }
    figure img { width: 240px; height: 240px; object-fit: cover; border-radius: 8px; }
    .missing { width: 240px; height: 240px; display: flex; align-items: center;
               justify-content: center; background: #f6f8fa; border-radius: 8px; color: #888; }
    figcaption { font-weight: 600; margin-top: 0.25rem; }
    time { color: #888; font-size: 0.85rem; }
  </style>
</head>
<body>
  <nav><a href="/">Upload</a><a href="/gallery">Gallery</a></nav>
  {body}
</body>
</html>
"#;

/// Escapes text for use in HTML content and double-quoted attributes
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn base(title: &str, body: &str) -> Html<String> {
    Html(
        BASE.replacen("{title}", &escape(title), 1)
            .replacen("{body}", body, 1),
    )
}

/// Landing page with the upload form posting to `upload_url`
#[must_use]
pub fn index(upload_url: &str) -> Html<String> {
    let body = format!(
        r#"<h1>Share a kitten</h1>
  <div class="card">
    <form action="{action}" method="POST" enctype="multipart/form-data">
      <label for="file">Photo</label>
      <input id="file" type="file" name="file" accept="image/*" />
      <label for="kitten_name">Kitten name</label>
      <input id="kitten_name" type="text" name="kitten_name" />
      <button type="submit">Upload</button>
    </form>
  </div>"#,
        action = escape(upload_url),
    );

    base("Kittens", &body)
}

/// Gallery page, one `row` div per group of uploads
#[must_use]
pub fn gallery(rows: &[Vec<DisplayItem>]) -> Html<String> {
    let mut body = String::from("<h1>Kittens</h1>\n");

    if rows.is_empty() {
        body.push_str(r#"  <p>No kittens yet. <a href="/">Upload the first one.</a></p>"#);
        return base("Kitten gallery", &body);
    }

    for row in rows {
        body.push_str("  <div class=\"row\">\n");
        for item in row {
            let name = escape(&item.upload.name);
            let image = item.url.as_deref().map_or_else(
                || r#"<div class="missing">Image unavailable</div>"#.to_string(),
                |url| format!(r#"<img src="{}" alt="{name}" />"#, escape(url)),
            );
            let _ = writeln!(
                body,
                r#"    <figure>{image}<figcaption>{name}</figcaption><time datetime="{time}">{display}</time></figure>"#,
                time = item.upload.upload_time.to_rfc3339(),
                display = item.upload.upload_time.format("%Y-%m-%d %H:%M UTC"),
            );
        }
        body.push_str("  </div>\n");
    }

    base("Kitten gallery", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use upload_storage::user_upload::UserUpload;

    fn item(name: &str, url: Option<&str>) -> DisplayItem {
        DisplayItem {
            upload: UserUpload {
                id: "id".to_string(),
                name: name.to_string(),
                blob_key: "kittens/abc/0".to_string(),
                upload_time: Utc::now(),
            },
            url: url.map(ToString::to_string),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_index_embeds_upload_url() {
        let Html(page) = index("/upload?ticket=abc.1.ff");

        assert!(page.contains(r#"action="/upload?ticket=abc.1.ff""#));
        assert!(page.contains(r#"name="file""#));
        assert!(page.contains(r#"name="kitten_name""#));
    }

    #[test]
    fn test_gallery_rows_and_escaping() {
        let rows = vec![
            vec![
                item("<script>", Some("https://img/1?a=1&b=2")),
                item("Tom", None),
                item("Felix", Some("https://img/3")),
            ],
            vec![item("Luna", Some("https://img/4"))],
        ];

        let Html(page) = gallery(&rows);

        assert_eq!(page.matches("class=\"row\"").count(), 2);
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("https://img/1?a=1&amp;b=2"));
        assert!(page.contains("Image unavailable"));
    }

    #[test]
    fn test_empty_gallery() {
        let Html(page) = gallery(&[]);
        assert!(page.contains("No kittens yet"));
    }
}
