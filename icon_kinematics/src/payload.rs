//! Dynamic payload of a robot.

use icon_common::{IconError, IconResult};
use icon_math::Pose3;
use icon_math::conversions::{matrix_from_wire, matrix_to_wire, pose_from_wire, pose_to_wire};
use icon_wire::kinematics as wire;
use nalgebra::Matrix3;

/// Two symmetric matrix entries may differ by at most this much.
const SYMMETRY_THRESHOLD: f64 = 1e-6;

/// Payload attached to the robot flange: mass, center of gravity and the
/// inertia tensor expressed about the center of gravity.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    mass_kg: f64,
    tip_t_cog: Pose3,
    inertia_in_cog: Matrix3<f64>,
}

impl Payload {
    /// Creates a payload from the given parameters. Fails if any parameter
    /// is invalid.
    pub fn create(mass_kg: f64, tip_t_cog: Pose3, inertia: Matrix3<f64>) -> IconResult<Self> {
        let mut payload = Self {
            mass_kg: 0.0,
            tip_t_cog: Pose3::identity(),
            inertia_in_cog: Matrix3::zeros(),
        };
        payload.set_mass(mass_kg)?;
        payload.set_tip_t_cog(tip_t_cog);
        payload.set_inertia(inertia)?;
        Ok(payload)
    }

    /// Sets the payload mass in kg. Zero is allowed for robots without a
    /// payload; negative masses are rejected.
    pub fn set_mass(&mut self, mass_kg: f64) -> IconResult<()> {
        if mass_kg != 0.0 {
            validate_mass(mass_kg)?;
        }
        self.mass_kg = mass_kg;
        Ok(())
    }

    /// Mass in kg.
    pub fn mass(&self) -> f64 {
        self.mass_kg
    }

    /// Sets the center-of-gravity pose relative to the flange/tip frame.
    pub fn set_tip_t_cog(&mut self, tip_t_cog: Pose3) {
        self.tip_t_cog = tip_t_cog;
    }

    pub fn tip_t_cog(&self) -> &Pose3 {
        &self.tip_t_cog
    }

    /// Sets the 3x3 inertia matrix about the center of gravity, in kg*m^2.
    /// The zero matrix is allowed for point masses.
    pub fn set_inertia(&mut self, inertia: Matrix3<f64>) -> IconResult<()> {
        if inertia != Matrix3::zeros() {
            validate_inertia(&inertia)?;
        }
        self.inertia_in_cog = inertia;
        Ok(())
    }

    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia_in_cog
    }
}

/// Rejects non-positive masses.
pub fn validate_mass(mass_kg: f64) -> IconResult<()> {
    if mass_kg <= 0.0 {
        return Err(IconError::invalid_argument(format!(
            "The mass should be > 0.0, but got {mass_kg} kg instead."
        )));
    }
    Ok(())
}

/// Validates that an inertia tensor is density realizable: symmetric,
/// positive definite, and with eigenvalues satisfying the triangle
/// inequality.
pub fn validate_inertia(inertia: &Matrix3<f64>) -> IconResult<()> {
    let max_asymmetry = (inertia - inertia.transpose()).abs().max();
    if max_asymmetry > SYMMETRY_THRESHOLD {
        return Err(IconError::invalid_argument(format!(
            "Inertia tensor is not symmetric. Got {inertia:?}."
        )));
    }

    let eigenvalues = inertia.symmetric_eigen().eigenvalues;
    if eigenvalues.iter().any(|v| *v <= 0.0) {
        return Err(IconError::invalid_argument(format!(
            "Inertia tensor is not positive definite. All of its eigenvalues should be \
             > 0.0, but got {eigenvalues:?}."
        )));
    }

    let sum: f64 = eigenvalues.iter().sum();
    for value in eigenvalues.iter() {
        if sum < 2.0 * value {
            return Err(IconError::invalid_argument(format!(
                "The eigenvalues of the inertia tensor do not satisfy the triangle \
                 inequality: {sum} is not larger or equal than {}.",
                2.0 * value
            )));
        }
    }
    Ok(())
}

/// Converts a payload wire form, treating a missing mass as 0 kg, a
/// missing center of gravity as identity and a missing inertia as the zero
/// matrix.
pub fn payload_from_wire(proto: &wire::RobotPayload) -> IconResult<Payload> {
    let tip_t_cog = match &proto.tip_t_cog {
        Some(pose) => pose_from_wire(pose)?,
        None => Pose3::identity(),
    };
    let inertia = match &proto.inertia {
        Some(matrix) => matrix_from_wire(matrix),
        None => Matrix3::zeros(),
    };
    Payload::create(proto.mass_kg, tip_t_cog, inertia)
}

pub fn payload_to_wire(payload: &Payload) -> wire::RobotPayload {
    wire::RobotPayload {
        mass_kg: payload.mass(),
        tip_t_cog: Some(pose_to_wire(payload.tip_t_cog())),
        inertia: Some(matrix_to_wire(payload.inertia())),
    }
}
