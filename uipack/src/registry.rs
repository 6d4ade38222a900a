//! Package directory and `ui://` URL resolution.
//!
//! The registry owns every loaded [`UiPackage`] behind shared handles,
//! the process-wide font directory, and the optional localization
//! source applied to component descriptors at decode time.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use crate::config::PackageConfig;
use crate::error::PackageError;
use crate::font::{BitmapFont, FontRegistry};
use crate::item::ItemPayload;
use crate::loader::ResourceLoader;
use crate::locale::StringsSource;
use crate::package::UiPackage;

/// A parsed `ui://` resource reference.
///
/// The id form packs an 8-character package id and the item id into the
/// authority; the name form separates package and item names with a
/// slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRef {
    ById { package: String, item: String },
    ByName { package: String, item: String },
}

/// Split a resource URL into its package and item parts.
///
/// Returns `None` for anything that is not a well-formed `ui://`
/// reference. Parsing is pure; it does not consult loaded packages.
pub fn parse_url(url: &str) -> Option<UrlRef> {
    let scheme_end = url.find("//")?;
    let body = &url[scheme_end + 2..];
    match body.find('/') {
        Some(slash) => Some(UrlRef::ByName {
            package: body[..slash].to_string(),
            item: body[slash + 1..].to_string(),
        }),
        None => {
            // Id form: "ui://" + 8-char package id + item id.
            if url.len() <= 13 {
                return None;
            }
            Some(UrlRef::ById {
                package: url.get(5..13)?.to_string(),
                item: url.get(13..)?.to_string(),
            })
        }
    }
}

/// Directory of loaded packages.
#[derive(Default)]
pub struct PackageRegistry {
    by_id: HashMap<String, Rc<RefCell<UiPackage>>>,
    by_name: HashMap<String, Rc<RefCell<UiPackage>>>,
    list: Vec<Rc<RefCell<UiPackage>>>,
    fonts: FontRegistry,
    strings: Option<StringsSource>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a package from descriptor bytes and register it.
    ///
    /// A package with the same id silently replaces the previous id
    /// mapping; the old instance stays reachable by name until removed.
    pub fn add_package(
        &mut self,
        desc: &[u8],
        loader: Option<Rc<dyn ResourceLoader>>,
        config: &PackageConfig,
    ) -> Result<Rc<RefCell<UiPackage>>, PackageError> {
        let package = UiPackage::create(
            desc,
            loader,
            None,
            config,
            &mut self.fonts,
            self.strings.as_ref(),
        )?;
        Ok(self.register(package))
    }

    /// Load a package whose resources live under a named main asset.
    ///
    /// Unlike [`add_package`](Self::add_package), an id collision here
    /// is logged before the replacement happens.
    pub fn add_package_with_prefix(
        &mut self,
        desc: &[u8],
        loader: Option<Rc<dyn ResourceLoader>>,
        main_asset_name: &str,
        config: &PackageConfig,
    ) -> Result<Rc<RefCell<UiPackage>>, PackageError> {
        let package = UiPackage::create(
            desc,
            loader,
            Some(main_asset_name),
            config,
            &mut self.fonts,
            self.strings.as_ref(),
        )?;
        if self.by_id.contains_key(package.id()) {
            warn!(package = %package.name(), id = %package.id(), "duplicated package id");
        }
        Ok(self.register(package))
    }

    /// Load a package by descriptor path through the resource loader.
    ///
    /// The path doubles as a registry alias: loading the same path
    /// again returns the already-registered instance.
    pub fn add_package_from_path(
        &mut self,
        path: &str,
        loader: Rc<dyn ResourceLoader>,
        config: &PackageConfig,
    ) -> Result<Rc<RefCell<UiPackage>>, PackageError> {
        if let Some(existing) = self.by_id.get(path) {
            return Ok(Rc::clone(existing));
        }
        let desc = loader
            .load_text(path)
            .ok_or_else(|| PackageError::DescriptorNotFound(path.to_string()))?;
        let package = UiPackage::create(
            &desc,
            Some(loader),
            None,
            config,
            &mut self.fonts,
            self.strings.as_ref(),
        )?;
        let handle = self.register(package);
        handle.borrow_mut().set_asset_path(Some(path.to_string()));
        self.by_id.insert(path.to_string(), Rc::clone(&handle));
        Ok(handle)
    }

    fn register(&mut self, package: UiPackage) -> Rc<RefCell<UiPackage>> {
        let handle = Rc::new(RefCell::new(package));
        {
            let pkg = handle.borrow();
            self.by_id.insert(pkg.id().to_string(), Rc::clone(&handle));
            self.by_name
                .insert(pkg.name().to_string(), Rc::clone(&handle));
        }
        self.list.push(Rc::clone(&handle));
        handle
    }

    /// Assign (or clear) an extra id alias for a loaded package.
    pub fn set_custom_id(&mut self, package_id: &str, custom_id: Option<&str>) {
        let Some(handle) = self.by_id.get(package_id).map(Rc::clone) else {
            warn!(id = %package_id, "cannot alias unknown package");
            return;
        };
        if let Some(old) = handle.borrow().custom_id() {
            self.by_id.remove(old);
        }
        if let Some(custom) = custom_id {
            self.by_id.insert(custom.to_string(), Rc::clone(&handle));
        }
        handle
            .borrow_mut()
            .set_custom_id(custom_id.map(str::to_string));
    }

    /// Unload a package by id, custom id, or name.
    ///
    /// Disposes the instance, evicts every alias it was reachable
    /// under, and unregisters its fonts. Returns `false` when nothing
    /// matched.
    pub fn remove_package(&mut self, id_or_name: &str) -> bool {
        let handle = self
            .by_id
            .get(id_or_name)
            .or_else(|| self.by_name.get(id_or_name))
            .map(Rc::clone);
        let Some(handle) = handle else {
            warn!(key = %id_or_name, "cannot remove unknown package");
            return false;
        };

        {
            let mut pkg = handle.borrow_mut();
            pkg.dispose(&mut self.fonts);
            self.by_id.remove(pkg.id());
            if let Some(custom) = pkg.custom_id() {
                self.by_id.remove(custom);
            }
            if let Some(path) = pkg.asset_path() {
                self.by_id.remove(path);
            }
            self.by_name.remove(pkg.name());
        }
        self.list.retain(|p| !Rc::ptr_eq(p, &handle));
        true
    }

    /// Unload every package.
    pub fn remove_all_packages(&mut self) {
        for handle in &self.list {
            handle.borrow_mut().dispose(&mut self.fonts);
        }
        self.list.clear();
        self.by_id.clear();
        self.by_name.clear();
    }

    /// Package by id (manifest id, custom id, or asset path alias).
    pub fn get_by_id(&self, id: &str) -> Option<Rc<RefCell<UiPackage>>> {
        self.by_id.get(id).map(Rc::clone)
    }

    /// Package by manifest name.
    pub fn get_by_name(&self, name: &str) -> Option<Rc<RefCell<UiPackage>>> {
        self.by_name.get(name).map(Rc::clone)
    }

    /// Every loaded package, in registration order.
    pub fn packages(&self) -> &[Rc<RefCell<UiPackage>>] {
        &self.list
    }

    /// Font by its registered name (`ui://<packageId><itemId>`).
    pub fn font(&self, name: &str) -> Option<Rc<RefCell<BitmapFont>>> {
        self.fonts.get(name)
    }

    /// Install a localization source applied to component descriptors
    /// as they decode. Already-memoized descriptors are unaffected.
    pub fn set_strings_source(&mut self, doc: &xmltree::Element) {
        self.strings = Some(StringsSource::from_markup(doc));
    }

    /// Id-form URL (`ui://<packageId><itemId>`) for a named resource.
    pub fn item_url(&self, pkg_name: &str, res_name: &str) -> Option<String> {
        let handle = self.get_by_name(pkg_name)?;
        let url = handle.borrow().item_url(res_name);
        url
    }

    /// Resolve a URL to its package handle and item id.
    pub fn item_by_url(&self, url: &str) -> Option<(Rc<RefCell<UiPackage>>, String)> {
        match parse_url(url)? {
            UrlRef::ById { package, item } => {
                let handle = self.get_by_id(&package)?;
                Some((handle, item))
            }
            UrlRef::ByName { package, item } => {
                let handle = self.get_by_name(&package)?;
                let id = handle.borrow().item_by_name(&item)?.id.clone();
                Some((handle, id))
            }
        }
    }

    /// Materialize the resource a URL points at.
    pub fn asset_by_url(&mut self, url: &str) -> Option<ItemPayload> {
        let (handle, item_id) = self.item_by_url(url)?;
        let payload = handle.borrow_mut().item_asset(&item_id, self.strings.as_ref());
        payload
    }
}
