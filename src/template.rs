use maud::{DOCTYPE, Markup, PreEscaped, html};

fn shell(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - fileport" }
                style { (PreEscaped(BASE_CSS)) }
            }
            body { (body) }
        }
    }
}

pub fn login_page(error: Option<&str>) -> Markup {
    shell(
        "Login",
        html! {
            div class="card narrow" {
                h1 class="title" { "Unlock transfer console" }
                p class="subtitle" { "Enter the password chosen when the server was started." }
                @if let Some(msg) = error {
                    div class="error" { (msg) }
                }
                form method="post" action="/login" {
                    input class="input" type="password" name="password"
                        placeholder="Password" autocomplete="current-password" autofocus;
                    button class="btn" type="submit" { "Enter" }
                }
            }
        },
    )
}

/// Main page: one upload row per folder plus the `/api/list` browser.
pub fn main_page(root: &str, folders: &[String]) -> Markup {
    shell(
        "File Transfer",
        html! {
            div class="card" {
                div class="top-bar" {
                    div {
                        div class="title" { "File Transfer" }
                        div class="subtitle" { "Root: " code { (root) } }
                    }
                    div class="actions" {
                        a class="btn-link" href="/download-zip" { "Download root as zip" }
                        button id="upload-all-btn" type="button" { "Upload all" }
                        button id="add-folder-btn" type="button" title="Upload into a new folder" { "+" }
                    }
                }

                h3 class="section-title" { "Upload" }
                div id="folder-list" class="folder-list" {
                    (upload_row("", "(root)"))
                    @for rel in folders {
                        (upload_row(rel, rel))
                    }
                }

                h3 class="section-title" { "Browse" }
                div class="browser" {
                    div class="browser-bar" {
                        button id="up-btn" type="button" { "Up" }
                        code id="browse-path" { "/" }
                        a id="zip-link" href="/download-zip" { "zip" }
                    }
                    div class="browser-bar" {
                        input id="new-name" class="input" type="text" placeholder="new name";
                        button id="new-file-btn" type="button" { "New file" }
                        button id="new-dir-btn" type="button" { "New folder" }
                    }
                    ul id="browse-list" {}
                    div id="browse-status" class="subtitle" {}
                }
            }
            script { (PreEscaped(UI_JS)) }
        },
    )
}

fn upload_row(rel: &str, label: &str) -> Markup {
    html! {
        form class="folder-row" data-folder=(rel) {
            span class="folder-name" { (label) }
            input class="file-input" type="file" name="files" multiple;
            button type="submit" { "Upload" }
            progress class="progress" max="100" value="0" {}
            span class="speed subtitle" {}
            pre class="result" {}
        }
    }
}

const BASE_CSS: &str = r#"
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; max-width: 960px;
  margin: 0 auto; padding: 16px; background: #f3f4f6; color: #111827; }
.card { margin-top: 16px; padding: 16px; border-radius: 16px; background: #fff;
  box-shadow: 0 12px 32px rgba(15,23,42,.12); }
.narrow { max-width: 420px; margin: 40px auto; }
.title { font-size: 18px; font-weight: 600; margin: 0 0 4px; }
.subtitle { font-size: 12px; color: #6b7280; margin: 0 0 12px; }
.input { width: 100%; padding: 8px 10px; border-radius: 8px; border: 1px solid #d1d5db; box-sizing: border-box; }
.btn { width: 100%; margin-top: 12px; padding: 9px; border-radius: 999px; border: none;
  background: #4f46e5; color: #fff; font-weight: 600; cursor: pointer; }
.error { color: #dc2626; font-size: 13px; margin-bottom: 8px; }
.top-bar { display: flex; justify-content: space-between; align-items: center; gap: 12px; flex-wrap: wrap; }
.section-title { font-size: 13px; text-transform: uppercase; letter-spacing: .06em; color: #6b7280; }
.folder-row { display: grid; grid-template-columns: 1fr auto auto; gap: 8px; align-items: center;
  padding: 8px; border-radius: 8px; background: #eef1ff; margin-bottom: 6px; }
.folder-row .progress, .folder-row .speed, .folder-row .result { grid-column: 1 / -1; width: 100%; margin: 0; }
.actions { display: flex; gap: 8px; align-items: center; }
.browser { border: 1px solid #e5e7eb; border-radius: 12px; padding: 8px; }
.browser-bar { display: flex; gap: 8px; align-items: center; margin-bottom: 8px; }
#browse-list { list-style: none; padding: 0; margin: 0; max-height: 50vh; overflow-y: auto; }
#browse-list li { display: flex; justify-content: space-between; padding: 4px 6px; border-radius: 6px; }
#browse-list li:hover { background: #f3f4ff; }
"#;

const UI_JS: &str = r#"
var currentDir = '';

function qs(dir) { return encodeURIComponent(dir); }

function uploadRow(form) {
  var files = form.querySelector('.file-input').files;
  var result = form.querySelector('.result');
  var bar = form.querySelector('.progress');
  var speed = form.querySelector('.speed');
  if (!files || files.length === 0) { return; }
  var data = new FormData();
  for (var i = 0; i < files.length; i++) { data.append('files', files[i]); }
  data.append('target', form.getAttribute('data-folder'));
  var xhr = new XMLHttpRequest();
  xhr.open('POST', '/upload', true);
  var started = Date.now();
  xhr.upload.onprogress = function (e) {
    if (!e.lengthComputable) { return; }
    bar.value = e.loaded / e.total * 100;
    var secs = (Date.now() - started) / 1000;
    if (secs > 0) {
      speed.textContent = (e.loaded / secs / (1024 * 1024)).toFixed(2) + ' MB/s';
    }
  };
  xhr.onload = function () {
    result.textContent = xhr.status === 200 ? xhr.responseText
      : 'Upload failed: ' + xhr.status + ' ' + xhr.responseText;
    if (xhr.status === 200) { browse(currentDir); }
  };
  xhr.onerror = function () { result.textContent = 'Upload error (network or server issue)'; };
  result.textContent = 'Uploading...';
  xhr.send(data);
}

function browse(dir) {
  fetch('/api/list?dir=' + qs(dir)).then(function (resp) {
    if (!resp.ok) { return resp.text().then(function (t) { throw new Error(t); }); }
    return resp.json();
  }).then(function (listing) {
    currentDir = listing.dir;
    document.getElementById('browse-path').textContent = listing.displayPath;
    document.getElementById('zip-link').href = '/download-zip?dir=' + qs(listing.dir);
    var list = document.getElementById('browse-list');
    list.innerHTML = '';
    var entries = listing.entries || [];
    entries.sort(function (a, b) {
      if (a.isDir !== b.isDir) { return a.isDir ? -1 : 1; }
      return a.name.localeCompare(b.name);
    });
    entries.forEach(function (e) {
      var li = document.createElement('li');
      var link = document.createElement('a');
      link.textContent = (e.isDir ? '[dir] ' : '') + e.name;
      if (e.isDir) {
        link.href = '#';
        link.onclick = function (ev) { ev.preventDefault(); browse(e.relPath); };
      } else {
        link.href = '/download?file=' + qs(e.relPath);
      }
      var meta = document.createElement('span');
      meta.className = 'subtitle';
      meta.textContent = e.isDir ? e.modTime : e.size + ' B, ' + e.modTime;
      li.appendChild(link);
      li.appendChild(meta);
      list.appendChild(li);
    });
    document.getElementById('browse-status').textContent = entries.length + ' item(s)';
  }).catch(function (err) {
    document.getElementById('browse-status').textContent = 'Error: ' + err.message;
  });
}

function createItem(isDir) {
  var name = document.getElementById('new-name').value.trim();
  if (!name) { return; }
  var path = currentDir ? currentDir + '/' + name : name;
  fetch('/api/create', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ path: path, isDir: isDir })
  }).then(function (resp) {
    if (!resp.ok) { return resp.text().then(function (t) { throw new Error(t); }); }
    document.getElementById('new-name').value = '';
    browse(currentDir);
  }).catch(function (err) {
    document.getElementById('browse-status').textContent = 'Error: ' + err.message;
  });
}

function bindRow(form) {
  form.addEventListener('submit', function (ev) { ev.preventDefault(); uploadRow(form); });
}

function addFolderRow() {
  var name = (window.prompt('Folder to upload into (e.g. photos/2024):') || '').trim();
  name = name.replace(/\\/g, '/').replace(/^\/+|\/+$/g, '');
  if (!name) { return; }
  var list = document.getElementById('folder-list');
  var row = list.querySelector('.folder-row').cloneNode(true);
  row.setAttribute('data-folder', name);
  row.querySelector('.folder-name').textContent = name + ' (new)';
  row.querySelector('.file-input').value = '';
  row.querySelector('.progress').value = 0;
  row.querySelector('.speed').textContent = '';
  row.querySelector('.result').textContent = '';
  list.appendChild(row);
  bindRow(row);
}

document.querySelectorAll('.folder-row').forEach(bindRow);
document.getElementById('add-folder-btn').onclick = addFolderRow;
document.getElementById('upload-all-btn').onclick = function () {
  document.querySelectorAll('.folder-row').forEach(uploadRow);
};
document.getElementById('up-btn').onclick = function () {
  var i = currentDir.lastIndexOf('/');
  browse(i < 0 ? '' : currentDir.slice(0, i));
};
document.getElementById('new-file-btn').onclick = function () { createItem(false); };
document.getElementById('new-dir-btn').onclick = function () { createItem(true); };
browse('');
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_shows_error_only_when_given() {
        assert!(!login_page(None).into_string().contains("class=\"error\""));
        let page = login_page(Some("Wrong password, try again.")).into_string();
        assert!(page.contains("Wrong password, try again."));
        assert!(page.contains("action=\"/login\""));
    }

    #[test]
    fn main_page_escapes_folder_names() {
        let page = main_page("/srv/myfiles", &["<b>x</b>".to_string()]).into_string();
        assert!(page.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!page.contains("<b>x</b>"));
    }

    #[test]
    fn main_page_offers_bulk_and_new_folder_uploads() {
        let page = main_page("/srv/myfiles", &[]).into_string();
        assert!(page.contains("id=\"upload-all-btn\""));
        assert!(page.contains("id=\"add-folder-btn\""));
        assert!(page.contains("class=\"speed subtitle\""));
        // The root row is always present for new rows to be cloned from.
        assert!(page.contains("data-folder=\"\""));
    }
}
