use maud::{html, Markup, PreEscaped};

// Loads Leaflet on first render only, then mirrors /api/view onto it.
// Markers are keyed by property id and updated in place.
const MAP_SCRIPT: &str = r#"
(function () {
  var el = document.getElementById('map');
  var map = null, markers = {}, applied = null;
  function popupContent(popup) {
    var box = document.createElement('div');
    var title = document.createElement('strong');
    title.textContent = popup.title;
    box.appendChild(title);
    box.appendChild(document.createElement('br'));
    box.appendChild(document.createTextNode(popup.priceLabel));
    return box;
  }
  function loadLeaflet(cb) {
    if (window.L) return cb();
    var css = document.createElement('link');
    css.rel = 'stylesheet'; css.href = el.dataset.leafletCss;
    document.head.appendChild(css);
    var s = document.createElement('script');
    s.src = el.dataset.leafletJs; s.onload = cb;
    document.head.appendChild(s);
  }
  function apply(scene) {
    if (!scene) return;
    var key = scene.surface + ':' + scene.revision;
    if (key === applied) return;
    applied = key;
    if (!map) {
      map = L.map(el).setView([scene.view.center.lat, scene.view.center.lng], scene.view.zoom);
      if (scene.baseLayer) L.tileLayer(scene.baseLayer.urlTemplate, { attribution: scene.baseLayer.attribution }).addTo(map);
    } else {
      map.setView([scene.view.center.lat, scene.view.center.lng], scene.view.zoom);
    }
    var seen = {};
    scene.markers.forEach(function (m) {
      seen[m.propertyId] = true;
      var content = popupContent(m.popup);
      var existing = markers[m.propertyId];
      if (existing) { existing.setLatLng([m.position.lat, m.position.lng]).setPopupContent(content); }
      else { markers[m.propertyId] = L.marker([m.position.lat, m.position.lng]).bindPopup(content).addTo(map); }
    });
    Object.keys(markers).forEach(function (id) {
      if (!seen[id]) { map.removeLayer(markers[id]); delete markers[id]; }
    });
  }
  function poll() {
    fetch('/api/view').then(function (r) { return r.json(); }).then(function (v) {
      apply(v.map);
      if (v.status.state === 'loading') setTimeout(poll, 500);
    });
  }
  loadLeaflet(poll);
  var form = document.getElementById('place-search');
  if (form) form.addEventListener('submit', function (e) {
    e.preventDefault();
    var q = form.querySelector('input').value;
    fetch('/api/places?q=' + encodeURIComponent(q)).then(function (r) { return r.json(); }).then(function (res) {
      var first = res.candidates[0];
      if (first && map) map.setView([first.lat, first.lng], 14);
    });
  });
})();
"#;

pub fn map_panel() -> Markup {
    html! {
        section class="map-panel" {
            form id="place-search" class="place-search" {
                label class="sr-only" for="place-q" { "Search a place" }
                input type="search" id="place-q" name="q" placeholder="Search this place" autocomplete="off";
                button type="submit" { "Go" }
            }
            div id="map"
                data-leaflet-js="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"
                data-leaflet-css="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" {}
            script { (PreEscaped(MAP_SCRIPT)) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_text_is_never_parsed_as_html() {
        let page = map_panel().into_string();
        assert!(page.contains("title.textContent = popup.title"));
        assert!(page.contains("createTextNode(popup.priceLabel)"));
        assert!(!page.contains("'<strong>'"));
        assert!(!page.contains("innerHTML"));
    }
}
