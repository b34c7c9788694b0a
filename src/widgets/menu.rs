//! `menu.List`: a selectable list whose child-bearing items open floating
//! sub menus positioned next to the selected item.
//!
//! Opening a sub menu needs the item's on-screen box, which only the
//! privileged context knows, so [`MenuList::select`] issues a `measure` call
//! and hands back a [`MeasureRequest`]. Resolving it creates the sub menu (or
//! repositions the one already created for that record) and marks it active.
//!
//! Sub menus are owned children held in `sub_menu_map`, keyed by record id.
//! `active_sub_menu` holds the record id of the open one, not the instance.

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bridge::{CrossContextBridge, PendingCall, MEASURE_ACTION};
use crate::config::{ClassDefinition, ConfigMap};
use crate::error::{BridgeError, Result, RuntimeError};
use crate::geometry::BoundingRect;
use crate::instance::InstanceId;
use crate::runtime::Runtime;
use crate::value::Value;

use super::component;

pub const CLASS_NAME: &str = "menu.List";

/// Class toggled by the `floating` config.
pub const FLOATING_CLS: &str = "neo-floating";

// ---------------------------------------------------------------------------
// MenuItem
// ---------------------------------------------------------------------------

/// One record of a list's `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub id: String,
    pub text: String,
    pub icon_cls: Option<String>,
    pub items: Vec<MenuItem>,
}

impl MenuItem {
    /// A record without children.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            icon_cls: None,
            items: Vec::new(),
        }
    }

    /// Set the icon css class.
    pub fn with_icon(mut self, cls: impl Into<String>) -> Self {
        self.icon_cls = Some(cls.into());
        self
    }

    /// Attach child records; the item then opens a sub menu.
    pub fn with_items(mut self, items: Vec<MenuItem>) -> Self {
        self.items = items;
        self
    }

    /// Whether selecting this item opens a sub menu.
    pub fn has_children(&self) -> bool {
        !self.items.is_empty()
    }

    /// Parse a record. Numeric ids are accepted and stringified.
    pub fn from_value(value: &Value) -> std::result::Result<Self, String> {
        let map = value
            .as_map()
            .ok_or_else(|| format!("menu records must be maps, got {value}"))?;

        let id = match map.get("id") {
            Some(Value::Str(s)) => s.clone(),
            Some(Value::Int(i)) => i.to_string(),
            Some(other) => return Err(format!("record id must be a string or integer, got {other}")),
            None => return Err("record is missing `id`".into()),
        };
        let text = match map.get("text") {
            Some(Value::Str(s)) => s.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => return Err(format!("record `{id}` has non-text `text`: {other}")),
        };
        let icon_cls = match map.get("icon_cls") {
            Some(Value::Str(s)) => Some(s.clone()),
            None | Some(Value::Null) => None,
            Some(other) => return Err(format!("record `{id}` has non-text `icon_cls`: {other}")),
        };
        let items = match map.get("items") {
            Some(Value::List(children)) => children
                .iter()
                .map(MenuItem::from_value)
                .collect::<std::result::Result<_, _>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => return Err(format!("record `{id}` has non-list `items`: {other}")),
        };

        Ok(Self {
            id,
            text,
            icon_cls,
            items,
        })
    }

    /// Record as stored in the `items` config.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("id".to_owned(), Value::from(self.id.as_str()));
        map.insert("text".to_owned(), Value::from(self.text.as_str()));
        if let Some(cls) = &self.icon_cls {
            map.insert("icon_cls".to_owned(), Value::from(cls.as_str()));
        }
        if self.has_children() {
            map.insert("items".to_owned(), items_value(&self.items));
        }
        Value::Map(map)
    }
}

impl From<MenuItem> for Value {
    fn from(item: MenuItem) -> Self {
        item.to_value()
    }
}

/// Records as a config value.
pub fn items_value(items: &[MenuItem]) -> Value {
    Value::List(items.iter().map(MenuItem::to_value).collect())
}

fn parse_items(value: &Value) -> std::result::Result<Vec<MenuItem>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::List(records) => records.iter().map(MenuItem::from_value).collect(),
        other => Err(format!("expected a list of records, got {other}")),
    }
}

// ---------------------------------------------------------------------------
// Class definition
// ---------------------------------------------------------------------------

/// Class definition for `menu.List`.
pub fn definition() -> ClassDefinition {
    ClassDefinition::new(CLASS_NAME)
        .extends(component::CLASS_NAME)
        .configs(
            ConfigMap::new()
                .declare("floating_", false)
                .declare("items_", Value::List(Vec::new()))
                .declare("sub_menu_gap", 0)
                .declare("sub_menu_map", Value::Map(BTreeMap::new()))
                .declare("active_sub_menu", Value::Null),
        )
        .after_set("floating", |rt, id, value, _| {
            component::toggle_cls(rt, id, FLOATING_CLS, value.as_bool().unwrap_or(false))
        })
        .before_set("items", |_, _, incoming, _| {
            let items = parse_items(&incoming).map_err(|message| RuntimeError::InvalidValue {
                config: "items".into(),
                message,
            })?;
            Ok(items_value(&items))
        })
        .after_set("items", |rt, id, _, _| {
            // records changed under an open sub menu: close it if its record is gone
            let list = MenuList(id);
            if let Some(key) = list.active_key(rt)? {
                if list.record(rt, &key).is_err() {
                    list.close_sub_menu(rt)?;
                }
            }
            Ok(())
        })
        .on_destroy(|rt, id| MenuList(id).close_sub_menu(rt).map(|_| ()))
}

// ---------------------------------------------------------------------------
// MenuList
// ---------------------------------------------------------------------------

/// Outcome of [`MenuList::select`].
#[derive(Debug)]
pub enum Selection {
    /// A record without children was selected; any open sub menu was closed.
    Leaf { record_id: String },
    /// The record whose sub menu was open was selected again; it was closed.
    Closed {
        record_id: String,
        sub_menu: Option<InstanceId>,
    },
    /// The record's box is being measured; resolve to open its sub menu.
    Measuring(MeasureRequest),
}

/// Handle to a `menu.List` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuList(InstanceId);

impl MenuList {
    /// Create a top-level list.
    pub fn create<K>(rt: &mut Runtime, overrides: impl IntoIterator<Item = (K, Value)>) -> Result<Self>
    where
        K: Into<String>,
    {
        rt.create(CLASS_NAME, overrides).map(MenuList)
    }

    /// Wrap an existing instance, checking it carries the list's configs.
    pub fn from_instance(rt: &Runtime, id: InstanceId) -> Result<Self> {
        rt.get(id, "sub_menu_map")?;
        Ok(MenuList(id))
    }

    /// The underlying instance.
    pub fn id(self) -> InstanceId {
        self.0
    }

    /// Current records, parsed from the `items` config.
    pub fn items(self, rt: &Runtime) -> Result<Vec<MenuItem>> {
        parse_items(&rt.get(self.0, "items")?).map_err(|message| RuntimeError::InvalidValue {
            config: "items".into(),
            message,
        })
    }

    /// The top-level record with `record_id`.
    pub fn record(self, rt: &Runtime, record_id: &str) -> Result<MenuItem> {
        self.items(rt)?
            .into_iter()
            .find(|item| item.id == record_id)
            .ok_or_else(|| RuntimeError::InvalidValue {
                config: "items".into(),
                message: format!("no record with id `{record_id}`"),
            })
    }

    /// Element id of the rendered item for `record_id`.
    pub fn item_id(self, rt: &Runtime, record_id: &str) -> Result<String> {
        Ok(format!("{}__{record_id}", component::element_id(rt, self.0)?))
    }

    /// Element id of the icon for `record_id`.
    pub fn icon_id(self, rt: &Runtime, record_id: &str) -> Result<String> {
        Ok(format!("{}__icon__{record_id}", component::element_id(rt, self.0)?))
    }

    /// Element id of the sub menu arrow for `record_id`.
    pub fn arrow_icon_id(self, rt: &Runtime, record_id: &str) -> Result<String> {
        Ok(format!(
            "{}__arrow_icon__{record_id}",
            component::element_id(rt, self.0)?
        ))
    }

    /// React to the user picking `record_id`.
    pub fn select(
        self,
        rt: &mut Runtime,
        bridge: &CrossContextBridge,
        record_id: &str,
    ) -> Result<Selection> {
        let record = self.record(rt, record_id)?;

        if !record.has_children() {
            self.close_sub_menu(rt)?;
            return Ok(Selection::Leaf {
                record_id: record.id,
            });
        }

        if self.active_key(rt)?.as_deref() == Some(record_id) {
            let sub_menu = self.close_sub_menu(rt)?;
            return Ok(Selection::Closed {
                record_id: record.id,
                sub_menu,
            });
        }

        let target = self.item_id(rt, record_id)?;
        let liveness = rt.liveness(self.0)?;
        let call = bridge.invoke_with_cancel(
            MEASURE_ACTION,
            json!({ "targetId": target }),
            liveness.clone(),
        );
        debug!(list = ?self.0, record = record_id, call = call.id(), "measuring item");

        Ok(Selection::Measuring(MeasureRequest {
            list: self,
            record_id: record.id,
            call,
            liveness,
        }))
    }

    /// Show the sub menu for `record_id` next to `rect`.
    ///
    /// Reuses the sub menu already created for the record, moving it; creates
    /// and takes ownership of a new one otherwise. Another open sub menu is
    /// closed first.
    pub fn open_sub_menu(
        self,
        rt: &mut Runtime,
        record_id: &str,
        rect: BoundingRect,
    ) -> Result<InstanceId> {
        let record = self.record(rt, record_id)?;
        if !record.has_children() {
            return Err(RuntimeError::InvalidValue {
                config: "items".into(),
                message: format!("record `{record_id}` has no children"),
            });
        }

        if let Some(active) = self.active_key(rt)? {
            if active != record_id {
                self.close_sub_menu(rt)?;
            }
        }

        let gap = rt.get(self.0, "sub_menu_gap")?.as_f64().unwrap_or(0.0);
        // minus the border
        let position = [
            ("left", Value::Float(rect.right + gap)),
            ("top", Value::Float(rect.top - 1.0)),
        ];

        let child = match self.sub_menu(rt, record_id)? {
            Some(existing) => {
                component::assign_style(rt, existing, position)?;
                existing
            }
            None => {
                let element = format!(
                    "{}__menu__{record_id}",
                    component::element_id(rt, self.0)?
                );
                let child = rt.create(
                    CLASS_NAME,
                    [
                        ("id", Value::from(element)),
                        ("floating", Value::Bool(true)),
                        ("items", items_value(&record.items)),
                        ("style", Value::map(position)),
                    ],
                )?;

                let mut map = self.sub_menu_map(rt)?;
                map.insert(record_id.to_owned(), Value::Instance(child));
                rt.set(self.0, "sub_menu_map", Value::Map(map))?;
                debug!(list = ?self.0, record = record_id, sub_menu = ?child, "created sub menu");
                child
            }
        };

        rt.set(self.0, "active_sub_menu", record_id)?;
        rt.mount(child)?;
        Ok(child)
    }

    /// Unmount the open sub menu (and its own open one) and clear the active
    /// record. The sub menu stays in the map for reuse.
    pub fn close_sub_menu(self, rt: &mut Runtime) -> Result<Option<InstanceId>> {
        let Some(key) = self.active_key(rt)? else {
            return Ok(None);
        };
        let child = self.sub_menu(rt, &key)?;
        if let Some(child) = child {
            MenuList(child).unmount(rt)?;
        }
        rt.set(self.0, "active_sub_menu", Value::Null)?;
        Ok(child)
    }

    /// Unmount this list together with its open sub menu.
    pub fn unmount(self, rt: &mut Runtime) -> Result<()> {
        self.close_sub_menu(rt)?;
        rt.unmount(self.0)
    }

    /// Destroy this list and every sub menu it created.
    pub fn destroy(self, rt: &mut Runtime) -> Result<()> {
        rt.destroy(self.0)
    }

    /// The open sub menu, if any.
    pub fn active_sub_menu(self, rt: &Runtime) -> Result<Option<InstanceId>> {
        match self.active_key(rt)? {
            Some(key) => self.sub_menu(rt, &key),
            None => Ok(None),
        }
    }

    /// The live sub menu created for `record_id`, open or not.
    pub fn sub_menu(self, rt: &Runtime, record_id: &str) -> Result<Option<InstanceId>> {
        Ok(self
            .sub_menu_map(rt)?
            .get(record_id)
            .and_then(Value::as_instance)
            .filter(|&child| rt.instances().is_live(child)))
    }

    /// Number of sub menus created so far.
    pub fn sub_menu_count(self, rt: &Runtime) -> Result<usize> {
        Ok(self.sub_menu_map(rt)?.len())
    }

    fn active_key(self, rt: &Runtime) -> Result<Option<String>> {
        Ok(rt
            .get(self.0, "active_sub_menu")?
            .as_str()
            .map(str::to_owned))
    }

    fn sub_menu_map(self, rt: &Runtime) -> Result<BTreeMap<String, Value>> {
        Ok(rt
            .get(self.0, "sub_menu_map")?
            .as_map()
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Measuring
// ---------------------------------------------------------------------------

/// A `measure` call in flight for one record.
#[derive(Debug)]
pub struct MeasureRequest {
    list: MenuList,
    record_id: String,
    call: PendingCall,
    liveness: CancellationToken,
}

impl MeasureRequest {
    /// The list that issued the measurement.
    pub fn list(&self) -> MenuList {
        self.list
    }

    /// Business id of the record being measured.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Bridge id of the `measure` call.
    pub fn call_id(&self) -> &str {
        self.call.id()
    }

    /// Wait for the bridge without touching the runtime.
    pub async fn measured(self) -> MeasuredItem {
        let outcome = self.call.wait().await;
        MeasuredItem {
            list: self.list,
            record_id: self.record_id,
            liveness: self.liveness,
            outcome,
        }
    }

    /// Wait for the measurement and open the sub menu.
    pub async fn resolve(self, rt: &mut Runtime) -> Result<Option<InstanceId>> {
        self.measured().await.apply(rt)
    }
}

/// A finished `measure` call, ready to apply.
#[derive(Debug)]
pub struct MeasuredItem {
    list: MenuList,
    record_id: String,
    liveness: CancellationToken,
    outcome: std::result::Result<JsonValue, BridgeError>,
}

impl MeasuredItem {
    /// Business id of the measured record.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Open the sub menu unless the list started tearing down meanwhile.
    ///
    /// Returns `Ok(None)` when the list is gone or the call was cancelled.
    pub fn apply(self, rt: &mut Runtime) -> Result<Option<InstanceId>> {
        if self.liveness.is_cancelled() {
            debug!(list = ?self.list.0, record = %self.record_id, "list gone, dropping measurement");
            return Ok(None);
        }
        let raw = match self.outcome {
            Ok(raw) => raw,
            Err(BridgeError::Cancelled { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let rect: BoundingRect =
            serde_json::from_value(raw).map_err(|e| BridgeError::Malformed(e.to_string()))?;
        self.list.open_sub_menu(rt, &self.record_id, rect).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{connect, protocol, BridgeConfig, ContextHost, HostEndpoint, LayoutHost};
    use crate::instance::LifecycleEvent;
    use pretty_assertions::assert_eq;
    use taffy::prelude::*;

    fn sized(width: f32, height: f32) -> Style {
        Style {
            size: Size {
                width: Dimension::from_length(width),
                height: Dimension::from_length(height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        }
    }

    /// A 40px header above the `menu` list, whose items are 200x20.
    fn layout() -> ContextHost<LayoutHost> {
        let mut host = LayoutHost::new(800.0, 600.0);
        let column = |w, h| Style {
            flex_direction: FlexDirection::Column,
            ..sized(w, h)
        };
        host.insert("viewport", None, column(800.0, 600.0)).unwrap();
        host.insert("header", Some("viewport"), sized(800.0, 40.0)).unwrap();
        host.insert("menu", Some("viewport"), column(200.0, 100.0)).unwrap();
        for item in ["menu__file", "menu__edit", "menu__quit"] {
            host.insert(item, Some("menu"), sized(200.0, 20.0)).unwrap();
        }
        ContextHost::new(host)
    }

    fn records() -> Vec<MenuItem> {
        vec![
            MenuItem::new("file", "File").with_items(vec![
                MenuItem::new("open", "Open").with_icon("fa-folder"),
                MenuItem::new("save", "Save"),
            ]),
            MenuItem::new("edit", "Edit").with_items(vec![MenuItem::new("undo", "Undo")]),
            MenuItem::new("quit", "Quit"),
        ]
    }

    fn setup() -> (Runtime, MenuList) {
        let mut rt = Runtime::default();
        super::super::define(&mut rt).unwrap();
        let list = MenuList::create(
            &mut rt,
            [
                ("id", Value::from("menu")),
                ("items", items_value(&records())),
                ("sub_menu_gap", Value::Int(4)),
            ],
        )
        .unwrap();
        (rt, list)
    }

    /// Answer every queued request.
    fn answer_all(
        host: &mut ContextHost<LayoutHost>,
        endpoint: &mut HostEndpoint,
        bridge: &CrossContextBridge,
    ) {
        while let Ok(raw) = endpoint.requests.try_recv() {
            let answer = host.respond(&raw).unwrap();
            bridge.receive(&answer).unwrap();
        }
    }

    fn measuring(selection: Selection) -> MeasureRequest {
        match selection {
            Selection::Measuring(request) => request,
            other => panic!("expected a measurement, got {other:?}"),
        }
    }

    #[test]
    fn records_parse_and_validate() {
        let (mut rt, list) = setup();
        assert_eq!(list.items(&rt).unwrap(), records());
        assert!(list.record(&rt, "file").unwrap().has_children());
        assert!(!list.record(&rt, "quit").unwrap().has_children());

        let err = rt
            .set(list.id(), "items", Value::List(vec![Value::from("nope")]))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidValue { config, .. } if config == "items"));
        assert_eq!(list.items(&rt).unwrap().len(), 3);
    }

    #[test]
    fn element_ids() {
        let (rt, list) = setup();
        assert_eq!(list.item_id(&rt, "file").unwrap(), "menu__file");
        assert_eq!(list.icon_id(&rt, "file").unwrap(), "menu__icon__file");
        assert_eq!(list.arrow_icon_id(&rt, "file").unwrap(), "menu__arrow_icon__file");
    }

    #[test]
    fn floating_toggles_class() {
        let (mut rt, list) = setup();
        assert!(!component::has_cls(&rt, list.id(), FLOATING_CLS).unwrap());
        rt.set(list.id(), "floating", true).unwrap();
        assert!(component::has_cls(&rt, list.id(), FLOATING_CLS).unwrap());
    }

    #[tokio::test]
    async fn select_opens_positioned_sub_menu() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();

        let request = measuring(list.select(&mut rt, &bridge, "edit").unwrap());
        answer_all(&mut host, &mut endpoint, &bridge);
        let sub = request.resolve(&mut rt).await.unwrap().unwrap();

        assert_eq!(list.active_sub_menu(&rt).unwrap(), Some(sub));
        assert_eq!(rt.owner_of(sub).unwrap(), Some(list.id()));
        assert!(rt.is_mounted(sub));
        assert_eq!(rt.get(sub, "floating").unwrap(), Value::Bool(true));
        assert!(component::has_cls(&rt, sub, FLOATING_CLS).unwrap());
        // edit sits at y = 40 + 20, right edge at 200
        assert_eq!(
            rt.get(sub, "style").unwrap(),
            Value::map([("left", 204.0), ("top", 59.0)])
        );
        assert_eq!(
            MenuList(sub).items(&rt).unwrap(),
            vec![MenuItem::new("undo", "Undo")]
        );
        assert_eq!(component::element_id(&rt, sub).unwrap(), "menu__menu__edit");
    }

    #[tokio::test]
    async fn same_record_twice_before_resolution_yields_one_sub_menu() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();

        let first = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        let second = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        assert_ne!(first.call_id(), second.call_id());
        answer_all(&mut host, &mut endpoint, &bridge);

        let a = first.resolve(&mut rt).await.unwrap().unwrap();
        let b = second.resolve(&mut rt).await.unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(list.sub_menu_count(&rt).unwrap(), 1);
        assert_eq!(rt.instances().live_count(), 2);
    }

    #[tokio::test]
    async fn reselect_closes_and_reopen_reuses() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();

        let request = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        answer_all(&mut host, &mut endpoint, &bridge);
        let sub = request.resolve(&mut rt).await.unwrap().unwrap();

        match list.select(&mut rt, &bridge, "file").unwrap() {
            Selection::Closed { record_id, sub_menu } => {
                assert_eq!(record_id, "file");
                assert_eq!(sub_menu, Some(sub));
            }
            other => panic!("expected close, got {other:?}"),
        }
        assert_eq!(list.active_sub_menu(&rt).unwrap(), None);
        assert!(!rt.is_mounted(sub));
        assert_eq!(list.sub_menu(&rt, "file").unwrap(), Some(sub));

        let again = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        answer_all(&mut host, &mut endpoint, &bridge);
        assert_eq!(again.resolve(&mut rt).await.unwrap(), Some(sub));
        assert!(rt.is_mounted(sub));
    }

    #[tokio::test]
    async fn switching_records_closes_the_previous_sub_menu() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();

        let file = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        answer_all(&mut host, &mut endpoint, &bridge);
        let file_menu = file.resolve(&mut rt).await.unwrap().unwrap();

        let edit = measuring(list.select(&mut rt, &bridge, "edit").unwrap());
        answer_all(&mut host, &mut endpoint, &bridge);
        let edit_menu = edit.resolve(&mut rt).await.unwrap().unwrap();

        assert!(!rt.is_mounted(file_menu));
        assert!(rt.is_mounted(edit_menu));
        assert_eq!(list.active_sub_menu(&rt).unwrap(), Some(edit_menu));

        assert!(matches!(
            list.select(&mut rt, &bridge, "quit").unwrap(),
            Selection::Leaf { .. }
        ));
        assert!(!rt.is_mounted(edit_menu));
        assert_eq!(list.sub_menu_count(&rt).unwrap(), 2);
    }

    #[tokio::test]
    async fn unmount_keeps_sub_menus_for_reuse() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();
        rt.mount(list.id()).unwrap();

        let request = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        answer_all(&mut host, &mut endpoint, &bridge);
        let sub = request.resolve(&mut rt).await.unwrap().unwrap();

        list.unmount(&mut rt).unwrap();
        assert!(!rt.is_mounted(list.id()));
        assert!(!rt.is_mounted(sub));
        assert!(!rt.is_destroyed(sub));
        assert_eq!(list.sub_menu(&rt, "file").unwrap(), Some(sub));
    }

    #[tokio::test]
    async fn destroy_takes_every_sub_menu_down_once() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();

        let mut opened = Vec::new();
        for record in ["file", "edit"] {
            let request = measuring(list.select(&mut rt, &bridge, record).unwrap());
            answer_all(&mut host, &mut endpoint, &bridge);
            opened.push(request.resolve(&mut rt).await.unwrap().unwrap());
        }
        rt.drain_lifecycle_events();

        list.destroy(&mut rt).unwrap();
        for sub in &opened {
            assert!(rt.is_destroyed(*sub));
        }
        assert!(rt.is_destroyed(list.id()));
        assert_eq!(rt.instances().live_count(), 0);

        let destroyed: Vec<_> = rt
            .drain_lifecycle_events()
            .into_iter()
            .filter(|e| matches!(e, LifecycleEvent::Destroy { .. }))
            .collect();
        assert_eq!(destroyed.len(), 3);

        assert_eq!(
            list.destroy(&mut rt),
            Err(RuntimeError::DestroyedInstanceAccess(list.id()))
        );
    }

    #[tokio::test]
    async fn measurement_after_destroy_is_dropped() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());
        let mut host = layout();

        let request = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        list.destroy(&mut rt).unwrap();
        assert_eq!(bridge.pending_count(), 1);

        assert_eq!(request.resolve(&mut rt).await.unwrap(), None);
        assert_eq!(bridge.pending_count(), 0);
        // the host still answers; the response no longer matches anything
        answer_all(&mut host, &mut endpoint, &bridge);
        assert_eq!(rt.instances().live_count(), 0);
    }

    #[tokio::test]
    async fn remote_failure_surfaces_as_bridge_error() {
        let (mut rt, list) = setup();
        let (bridge, mut endpoint, _inbox) = connect(BridgeConfig::default());

        let request = measuring(list.select(&mut rt, &bridge, "file").unwrap());
        let raw = endpoint.requests.try_recv().unwrap();
        let id = protocol::decode_request(&raw).unwrap().id;
        bridge.receive(&protocol::encode(&protocol::Response::failure(id, "detached")).unwrap())
            .unwrap();

        let err = request.resolve(&mut rt).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Bridge(BridgeError::Remote { ref message, .. }) if message == "detached"
        ));
        assert_eq!(list.sub_menu_count(&rt).unwrap(), 0);
    }
}
