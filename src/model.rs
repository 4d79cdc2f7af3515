use crate::error::DioramaError;
use crate::vertex::{ColoredVertex, Triangle};
use cgmath::{InnerSpace, Vector3 as Vec3, Zero};
use obj::Obj;
use std::path::Path;
use tracing::{debug, info, warn};

/// 索引三角网格，位置和法线一一对应
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3<f32>>,
    pub normals: Vec<Vec3<f32>>,
    pub indices: Vec<[usize; 3]>,
}

impl Mesh {
    /// 面积加权平均相邻面法线
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::zero(); self.positions.len()];

        for &[a, b, c] in &self.indices {
            let face_normal =
                Triangle::face_normal(self.positions[a], self.positions[b], self.positions[c]);
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }

        for n in normals.iter_mut() {
            if n.magnitude2() > 0.0 {
                *n = n.normalize();
            }
        }
        self.normals = normals;
    }

    pub fn bounds(&self) -> Option<(Vec3<f32>, Vec3<f32>)> {
        let first = *self.positions.first()?;
        let (min, max) = self.positions.iter().skip(1).fold((first, first), |(lo, hi), p| {
            (
                Vec3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Vec3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        });
        Some((min, max))
    }

    /// 把网格居中到原点并缩放到最长边等于 `size`
    pub fn fit_to(&mut self, size: f32) {
        let Some((min, max)) = self.bounds() else {
            return;
        };
        let extent = max - min;
        let longest = extent.x.max(extent.y).max(extent.z);
        if longest <= 0.0 {
            return;
        }
        let center = (min + max) * 0.5;
        let scale = size / longest;
        for p in self.positions.iter_mut() {
            *p = (*p - center) * scale;
        }
    }

    pub fn triangles(&self, color: Vec3<f32>) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.iter().map(move |&[a, b, c]| {
            let vertex = |i: usize| ColoredVertex {
                pos: self.positions[i],
                color,
                normal: self.normals[i],
            };
            Triangle::new(vertex(a), vertex(b), vertex(c))
        })
    }
}

pub fn load_obj(path: &Path) -> Result<Mesh, DioramaError> {
    let obj = Obj::load(path)?;

    let positions: Vec<Vec3<f32>> = obj
        .data
        .position
        .iter()
        .map(|pos| Vec3::new(pos[0], pos[1], pos[2]))
        .collect();

    let mut indices = Vec::new();
    for object in &obj.data.objects {
        for group in &object.groups {
            for poly in &group.polys {
                // 多边形按扇形拆成三角形
                let corners: Vec<usize> = poly.0.iter().map(|idx| idx.0).collect();
                if corners.len() < 3 {
                    warn!("跳过退化面: {} 个顶点", corners.len());
                    continue;
                }
                for k in 1..corners.len() - 1 {
                    indices.push([corners[0], corners[k], corners[k + 1]]);
                }
            }
        }
    }

    let mut mesh = Mesh {
        positions,
        normals: Vec::new(),
        indices,
    };
    mesh.compute_vertex_normals();
    info!(
        path = %path.display(),
        vertices = mesh.positions.len(),
        triangles = mesh.indices.len(),
        "模型加载完成"
    );
    Ok(mesh)
}

type LoadedCallback<T> = Box<dyn FnOnce(&mut T)>;

/// 异步资源的完成回调槽。
///
/// 完成前注册的回调在 `complete` 时按注册顺序各执行一次，
/// 且都在资源第一次被读取之前；完成后注册的回调立即执行。
pub struct PendingAsset<T> {
    name: String,
    value: Option<T>,
    callbacks: Vec<LoadedCallback<T>>,
}

impl<T> PendingAsset<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            callbacks: Vec::new(),
        }
    }

    pub fn on_loaded<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut T) + 'static,
    {
        match self.value.as_mut() {
            Some(value) => callback(value),
            None => self.callbacks.push(Box::new(callback)),
        }
    }

    pub fn complete(&mut self, mut value: T) {
        if self.value.is_some() {
            warn!(asset = %self.name, "资源重复完成，替换旧值");
        }
        for callback in self.callbacks.drain(..) {
            callback(&mut value);
        }
        debug!(asset = %self.name, "资源就绪");
        self.value = Some(value);
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    #[cfg(test)]
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_inner(self) -> Option<T> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quad() -> Mesh {
        Mesh {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            ],
            normals: Vec::new(),
            indices: vec![[0, 1, 2], [2, 3, 0]],
        }
    }

    #[test]
    fn flat_quad_normals_point_up() {
        let mut mesh = quad();
        mesh.compute_vertex_normals();
        assert_eq!(mesh.normals.len(), 4);
        for n in &mesh.normals {
            assert!((n.z - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn fit_to_centers_and_scales() {
        let mut mesh = quad();
        mesh.fit_to(1.0);
        let (min, max) = mesh.bounds().unwrap();
        assert!((min.x + 0.5).abs() < 1e-6);
        assert!((max.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pending_callbacks_run_once_in_order_before_use() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut slot: PendingAsset<Vec<u32>> = PendingAsset::new("test");

        let l = log.clone();
        slot.on_loaded(move |v| {
            l.borrow_mut().push("first");
            v.push(1);
        });
        let l = log.clone();
        slot.on_loaded(move |v| {
            l.borrow_mut().push("second");
            v.push(2);
        });
        assert!(!slot.is_loaded());
        assert!(log.borrow().is_empty());

        slot.complete(Vec::new());
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(slot.get(), Some(&vec![1, 2]));

        // 再次完成不会重放旧回调
        slot.complete(vec![9]);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn late_callback_runs_immediately() {
        let mut slot = PendingAsset::new("late");
        slot.complete(5_u32);
        let seen = Rc::new(RefCell::new(0));
        let s = seen.clone();
        slot.on_loaded(move |v| *s.borrow_mut() = *v);
        assert_eq!(*seen.borrow(), 5);
    }

    #[test]
    fn missing_obj_is_an_error() {
        let result = load_obj(Path::new("does/not/exist.obj"));
        assert!(result.is_err());
    }
}
