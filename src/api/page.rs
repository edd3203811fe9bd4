// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload page served at `/`
//!
//! A single static page: pick a file OR enter a URL (choosing one clears the
//! other), the image is posted to `/v1/classify/upload` and the prediction is
//! shown above the preview.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Classify Fruits</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 42rem; margin: 2rem auto; padding: 0 1rem; color: #333; }
  h1 { background: linear-gradient(90deg, #e53935, #fb8c00, #fdd835, #43a047, #1e88e5, #8e24aa);
       -webkit-background-clip: text; background-clip: text; color: transparent; }
  .or { text-align: center; color: gray; margin: 0.75rem 0; }
  input[type=url] { width: 100%; padding: 0.4rem; box-sizing: border-box; }
  #result { font-size: 1.6rem; margin: 1rem 0; min-height: 2rem; }
  #result .label { color: #2e7d32; font-style: italic; font-weight: bold; }
  #result .confidence { color: gray; }
  #result.error { color: #c62828; font-size: 1rem; }
  #preview { max-width: 100%; display: none; }
  .note { color: gray; font-size: 0.9rem; }
</style>
</head>
<body>
<h1>Classify Fruits</h1>
<p>Classify a fruit photo with a fine-tuned ResNet50 network. The background is
removed before classification.</p>
<p class="note"><strong>Note</strong>: works best when the image contains a single
unpeeled fruit on a plain background.</p>

<form id="form">
  <label for="file">Upload image</label><br>
  <input id="file" name="file" type="file" accept="image/png,image/jpeg">
  <div class="or"><strong>OR</strong></div>
  <label for="url">Enter image URL</label><br>
  <input id="url" name="url" type="url" placeholder="https://...">
</form>

<div id="result"></div>
<img id="preview" alt="">

<script>
  const file = document.getElementById('file');
  const url = document.getElementById('url');
  const result = document.getElementById('result');
  const preview = document.getElementById('preview');

  async function classify(body) {
    result.className = '';
    result.textContent = 'Classifying...';
    try {
      const res = await fetch('/v1/classify/upload', { method: 'POST', body });
      if (!res.ok) {
        const body = await res.json().catch(() => ({ message: res.statusText }));
        throw new Error(body.message);
      }
      const data = await res.json();
      result.innerHTML = '';
      const label = document.createElement('span');
      label.className = 'label';
      label.textContent = data.label;
      const confidence = document.createElement('span');
      confidence.className = 'confidence';
      confidence.textContent = ' (' + data.confidence + '%)';
      result.append(label, confidence);
    } catch (e) {
      result.className = 'error';
      result.textContent = e.message;
    }
  }

  file.addEventListener('change', () => {
    url.value = '';
    if (!file.files.length) return;
    preview.src = URL.createObjectURL(file.files[0]);
    preview.style.display = 'block';
    const body = new FormData();
    body.append('file', file.files[0]);
    classify(body);
  });

  url.addEventListener('change', () => {
    file.value = '';
    const value = url.value.trim();
    if (!value) return;
    preview.src = value;
    preview.style.display = 'block';
    const body = new FormData();
    body.append('url', value);
    classify(body);
  });
</script>
</body>
</html>
"#;
